//! tree-walking interpreter for lowered programs

use std::cmp::Ordering;

use serde_json::Value as JsonValue;
use thiserror::Error;

use super::builtins::{Builtin, BuiltinError};
use super::compare;
use super::registry::Registry;
use crate::compiler::{BinaryOp, Node};
use crate::conditions::Ops;
use crate::scalar::{self, Bindings};
use crate::suggest;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("unknown function '{name}'{hint}")]
    UnknownFunction { name: String, hint: String },

    #[error("{name}() expects {expected} arguments, got {actual}")]
    Arity {
        name: String,
        expected: String,
        actual: usize,
    },

    #[error("{name}() failed")]
    Call {
        name: String,
        #[source]
        source: BuiltinError,
    },
}

/// resolve every call in the tree against the whitelist without running it
pub(super) fn validate(registry: &Registry, root: &Node) -> Result<(), RuntimeError> {
    for (name, argc) in root.calls() {
        resolve(registry, name, argc)?;
    }
    Ok(())
}

enum Callee<'r> {
    Function(&'r Builtin),
    Constant(&'r JsonValue),
}

fn resolve<'r>(registry: &'r Registry, name: &str, argc: usize) -> Result<Callee<'r>, RuntimeError> {
    if let Some(spec) = registry.function(name) {
        if !spec.builtin.accepts(argc) {
            return Err(RuntimeError::Arity {
                name: name.to_string(),
                expected: spec.builtin.arity(),
                actual: argc,
            });
        }
        return Ok(Callee::Function(spec.builtin));
    }

    // zero-argument calls fall back to constants (`PI()`)
    if argc == 0 {
        if let Some(value) = registry.constant(name) {
            return Ok(Callee::Constant(value));
        }
    }

    let candidates = registry
        .functions()
        .map(|f| f.code.as_str())
        .chain(registry.constants().map(|(name, _)| name.as_str()));
    Err(RuntimeError::UnknownFunction {
        name: name.to_string(),
        hint: suggest::hint(suggest::closest(name, candidates)),
    })
}

pub(super) struct Interpreter<'a> {
    registry: &'a Registry,
    data: &'a Bindings,
}

impl<'a> Interpreter<'a> {
    pub(super) fn new(registry: &'a Registry, data: &'a Bindings) -> Self {
        Self { registry, data }
    }

    pub(super) fn eval(&self, node: &Node) -> Result<JsonValue, RuntimeError> {
        Ok(match node {
            Node::Literal(value) | Node::Raw { value, .. } => value.clone(),
            Node::Lookup(path) => scalar::lookup(self.data, path)
                .cloned()
                .unwrap_or(JsonValue::Null),
            Node::Call { name, args } => self.call(name, args)?,
            Node::Concat(children) => {
                let mut out = String::new();
                for child in children {
                    out.push_str(&scalar::stringify(&self.eval(child)?));
                }
                JsonValue::String(out)
            }
            Node::Not(inner) => JsonValue::Bool(!scalar::truthy(&self.eval(inner)?)),
            Node::IsSet(inner) => JsonValue::Bool(!self.is_unset(inner)?),
            Node::Coalesce(inner) => {
                let value = self.eval(inner)?;
                if scalar::is_unset(Some(&value)) {
                    JsonValue::String(String::new())
                } else {
                    value
                }
            }
            Node::Contains(haystack, needle) => {
                JsonValue::Bool(compare::contains(&self.eval(haystack)?, &self.eval(needle)?))
            }
            Node::Binary { op, left, right } => {
                let (l, r) = (self.eval(left)?, self.eval(right)?);
                JsonValue::Bool(binary(*op, &l, &r))
            }
            Node::Logical { op, children } => JsonValue::Bool(self.logical(*op, children)?),
            Node::Paren(inner) => self.eval(inner)?,
        })
    }

    fn call(&self, name: &str, args: &[Node]) -> Result<JsonValue, RuntimeError> {
        match resolve(self.registry, name, args.len())? {
            Callee::Constant(value) => Ok(value.clone()),
            Callee::Function(builtin) => {
                let args = args
                    .iter()
                    .map(|a| self.eval(a))
                    .collect::<Result<Vec<_>, _>>()?;
                (builtin.call)(&args).map_err(|source| RuntimeError::Call {
                    name: name.to_string(),
                    source,
                })
            }
        }
    }

    /// lookups are tested on the bound path itself so that a missing key and
    /// an explicit null behave the same
    fn is_unset(&self, node: &Node) -> Result<bool, RuntimeError> {
        match node {
            Node::Lookup(path) => Ok(scalar::is_unset(scalar::lookup(self.data, path))),
            other => Ok(scalar::is_unset(Some(&self.eval(other)?))),
        }
    }

    /// short-circuits left to right
    fn logical(&self, op: Ops, children: &[Node]) -> Result<bool, RuntimeError> {
        for child in children {
            let value = scalar::truthy(&self.eval(child)?);
            match op {
                Ops::And if !value => return Ok(false),
                Ops::Or if value => return Ok(true),
                _ => {}
            }
        }
        Ok(op == Ops::And)
    }
}

fn binary(op: BinaryOp, l: &JsonValue, r: &JsonValue) -> bool {
    let ordering = || compare::compare(l, r);
    match op {
        BinaryOp::LooseEq => compare::loose_eq(l, r),
        BinaryOp::LooseNe => !compare::loose_eq(l, r),
        BinaryOp::StrictEq => compare::strict_eq(l, r),
        BinaryOp::StrictNe => !compare::strict_eq(l, r),
        BinaryOp::Gt => ordering() == Some(Ordering::Greater),
        BinaryOp::Lt => ordering() == Some(Ordering::Less),
        BinaryOp::Gte => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
        BinaryOp::Lte => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
    }
}
