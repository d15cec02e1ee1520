//! sandboxed execution of compiled programs
//!
//! a sandbox executes a lowered `Program` against named bindings. the only
//! callable surface is the registry whitelist; every execution opens its own
//! session holding exactly one program, released on drop whatever the
//! outcome.

mod builtins;
mod compare;
mod interp;
mod registry;

pub use builtins::{Builtin, BuiltinError, BUILTINS};
pub use compare::{compare, contains, loose_eq, strict_eq};
pub use interp::RuntimeError;
pub use registry::{
    global as global_registry, register_global, ArgEntry, FunctionEntry, FunctionGroup,
    FunctionList, FunctionSpec, Registry,
};

use std::collections::HashSet;
use std::error::Error as StdError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;

use crate::compiler::Program;
use crate::scalar::Bindings;
use interp::Interpreter;

/// maximum number of causes folded into one error message
const MAX_CAUSES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SandboxError {
    #[error("sandbox error: registration failed: {message}")]
    Registration { message: String },

    #[error("sandbox error: program rejected: {message}")]
    Rejected { message: String },

    #[error("sandbox error: execution failed: {message}")]
    Execution { message: String },
}

/// join an error and its sources with `": "`, up to `MAX_CAUSES` deep
fn cause_chain(err: &dyn StdError) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        if parts.len() >= MAX_CAUSES {
            break;
        }
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}

pub struct Sandbox {
    registry: Arc<Registry>,
    sessions: Mutex<HashSet<u64>>,
    next_id: AtomicU64,
}

impl Sandbox {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            sessions: Mutex::new(HashSet::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// sandbox over the current process-wide whitelist
    pub fn global() -> Self {
        Self::new(registry::global())
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// number of sessions currently open
    pub fn live_sessions(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// open a session for one program, validating it against the whitelist
    pub fn open<'s, 'p>(&'s self, program: &'p Program) -> Result<Session<'s, 'p>, SandboxError> {
        interp::validate(&self.registry, program.root()).map_err(|e| SandboxError::Rejected {
            message: cause_chain(&e),
        })?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        Ok(Session {
            sandbox: self,
            program,
            id,
        })
    }

    /// run a program once; the session is released on every path
    pub fn execute(&self, program: &Program, data: &Bindings) -> Result<JsonValue, SandboxError> {
        let session = self.open(program)?;
        session.run(data)
    }

    /// dry open/validate/release cycle, reporting why a program is rejected
    pub fn check(&self, program: &Program) -> Result<(), SandboxError> {
        self.open(program).map(drop)
    }

    pub fn is_effective(&self, program: &Program) -> bool {
        self.check(program).is_ok()
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::global()
    }
}

/// an isolated execution scope holding exactly one program
pub struct Session<'s, 'p> {
    sandbox: &'s Sandbox,
    program: &'p Program,
    id: u64,
}

impl Session<'_, '_> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn run(&self, data: &Bindings) -> Result<JsonValue, SandboxError> {
        debug!(session = self.id, code = %self.program, "executing program");
        Interpreter::new(&self.sandbox.registry, data)
            .eval(self.program.root())
            .map_err(|e| SandboxError::Execution {
                message: cause_chain(&e),
            })
    }
}

impl Drop for Session<'_, '_> {
    fn drop(&mut self) {
        self.sandbox
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}
