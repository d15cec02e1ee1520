//! code generator: lowers expression and condition trees to a `Program`
//!
//! lowering is pure. the resulting tree renders the generated source via
//! `Display` and is what the sandbox executes; no source text is ever
//! evaluated.

mod lower;
mod node;

pub use node::{parse_fragment, quote, BinaryOp, Node};

use std::fmt;

use tracing::trace;

use crate::conditions::Condition;
use crate::error::CompileError;
use crate::expression::{Expression, Value};

/// one compiled unit, executed by a single sandbox session
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    root: Node,
}

impl Program {
    pub fn new(root: Node) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// generated source
    pub fn code(&self) -> String {
        self.root.to_string()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.fmt(f)
    }
}

pub fn compile_expression(expr: &Expression) -> Result<Program, CompileError> {
    let program = Program::new(lower::expression(expr)?);
    trace!(code = %program, "compiled expression");
    Ok(program)
}

pub fn compile_value(value: &Value) -> Result<Program, CompileError> {
    let program = Program::new(lower::value(value)?);
    trace!(code = %program, "compiled value");
    Ok(program)
}

pub fn compile_condition(cond: &Condition) -> Result<Program, CompileError> {
    let program = Program::new(lower::condition(cond)?);
    trace!(code = %program, "compiled condition");
    Ok(program)
}
