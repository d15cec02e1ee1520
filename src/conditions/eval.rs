//! condition validation and evaluation
//!
//! a condition is lowered to one boolean program and executed in a single
//! sandbox session against the trans-bound data.

use tracing::debug;

use super::types::{Condition, ConditionNode, Ops};
use crate::compiler::{self, Program};
use crate::error::{CompileError, Result};
use crate::sandbox::Sandbox;
use crate::scalar::{self, Bindings};
use crate::trans;

impl Condition {
    /// build a condition and check the generated program against the
    /// sandbox whitelist
    pub fn new(ops: Ops, children: Vec<ConditionNode>, sandbox: &Sandbox) -> Result<Self> {
        let cond = Self::from_parts(ops, children);
        cond.validate(sandbox)?;
        Ok(cond)
    }

    /// compile and dry-run the condition through a sandbox session
    pub fn validate(&self, sandbox: &Sandbox) -> Result<Program> {
        let program = compiler::compile_condition(self)?;
        sandbox
            .check(&program)
            .map_err(|e| CompileError::Ineffective {
                reason: e.to_string(),
            })?;
        Ok(program)
    }

    /// generated source for this condition
    pub fn code(&self) -> Result<String, CompileError> {
        Ok(compiler::compile_condition(self)?.code())
    }

    pub fn get_result(&self, sandbox: &Sandbox, data: &Bindings) -> Result<bool> {
        let bound = trans::bind(self.trans_items(), data)?;
        let program = compiler::compile_condition(self)?;
        let value = sandbox.execute(&program, &bound)?;
        let result = scalar::truthy(&value);
        debug!(code = %program, result, "evaluated condition");
        Ok(result)
    }
}
