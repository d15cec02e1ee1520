//! error taxonomy for building, compiling, executing and coercing flow values
//!
//! every error here describes a design-time mistake in the flow; none of
//! them are retried internally.

use thiserror::Error;

use crate::expression::DataType;
use crate::sandbox::SandboxError;
use crate::trans::TransError;

/// result alias used across the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// top-level error returned by the public API
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error(transparent)]
    Coercion(#[from] CoercionError),

    #[error(transparent)]
    Trans(#[from] TransError),
}

/// malformed builder input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.render())]
pub struct BuildError {
    pub message: String,
    /// JSON path of the offending node, empty for the root
    pub path: String,
}

impl BuildError {
    pub fn new(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: path.into(),
        }
    }

    fn render(&self) -> String {
        if self.path.is_empty() {
            format!("build error: {}", self.message)
        } else {
            format!("build error at {}: {}", self.path, self.message)
        }
    }
}

/// the generator could not lower a tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("compile error: {kind} items cannot be compiled: {reason}")]
    UnsupportedItem { kind: &'static str, reason: String },

    #[error("compile error: condition is not accepted by the sandbox: {reason}")]
    Ineffective { reason: String },
}

/// result does not fit the declared data type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("coercion error: cannot convert {actual} to {expected}")]
pub struct CoercionError {
    pub expected: DataType,
    /// runtime type name of the offending value
    pub actual: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_error_display_with_path() {
        let err = BuildError::new("missing left operand", "children[0]");
        assert_eq!(
            err.to_string(),
            "build error at children[0]: missing left operand"
        );

        let err = BuildError::new("expected object", "");
        assert_eq!(err.to_string(), "build error: expected object");
    }

    #[test]
    fn test_coercion_error_display() {
        let err = CoercionError {
            expected: DataType::Array,
            actual: "string",
        };
        assert_eq!(
            err.to_string(),
            "coercion error: cannot convert string to array"
        );
    }

    #[test]
    fn test_error_wraps_variants() {
        let err: Error = BuildError::new("bad", "x").into();
        assert!(matches!(err, Error::Build(_)));
    }
}
