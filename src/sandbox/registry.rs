//! whitelist of callable functions and constants
//!
//! registration is driven by a list of groups:
//!
//! ```json5
//! [
//!   { group: "string", functions: { upper: { return_type: "string", args: ["value"] } } },
//!   { group: "math", functions: ["abs", "round"], constants: { TAX: 0.2 } },
//!   { group: "alias", functions: { shout: { function: "upper" } } },
//! ]
//! ```
//!
//! entries without `function` resolve to the same-named host builtin.
//! registering a code that already exists is a no-op.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, trace};

use super::builtins::{self, Builtin};
use super::SandboxError;
use crate::suggest;

// ============================================================================
// Registration schema
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionGroup {
    pub group: String,
    #[serde(default)]
    pub functions: FunctionList,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub constants: Map<String, JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FunctionList {
    Detailed(BTreeMap<String, FunctionEntry>),
    Names(Vec<String>),
}

impl Default for FunctionList {
    fn default() -> Self {
        FunctionList::Names(Vec::new())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    /// overrides the enclosing group name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, alias = "description", skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ArgEntry>,
    /// host builtin implementing this code, defaults to the code itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgEntry {
    Name(String),
    Detailed {
        name: String,
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
        #[serde(default = "default_required")]
        required: bool,
    },
}

fn default_required() -> bool {
    true
}

impl ArgEntry {
    pub fn name(&self) -> &str {
        match self {
            ArgEntry::Name(name) | ArgEntry::Detailed { name, .. } => name,
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// a registered function code
#[derive(Debug, Clone)]
pub struct FunctionSpec {
    pub code: String,
    pub group: String,
    pub return_type: String,
    pub description: String,
    pub args: Vec<ArgEntry>,
    pub builtin: &'static Builtin,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    functions: BTreeMap<String, FunctionSpec>,
    constants: BTreeMap<String, JsonValue>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// every host builtin under its own name, plus the default constants
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for builtin in builtins::BUILTINS {
            registry.insert_function(builtin.name, builtin.group, &FunctionEntry::default(), builtin);
        }
        for (name, value) in builtins::default_constants() {
            registry.constants.insert(name, value);
        }
        registry
    }

    pub fn function(&self, code: &str) -> Option<&FunctionSpec> {
        self.functions.get(code)
    }

    pub fn constant(&self, name: &str) -> Option<&JsonValue> {
        self.constants.get(name)
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionSpec> {
        self.functions.values()
    }

    pub fn constants(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.constants.iter()
    }

    pub fn len(&self) -> usize {
        self.functions.len() + self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// register a whitelist; returns how many new codes were added
    ///
    /// all-or-nothing: on error the registry is left untouched.
    pub fn register_groups(&mut self, groups: &[FunctionGroup]) -> Result<usize, SandboxError> {
        let mut staged = self.clone();
        let mut added = 0;

        for group in groups {
            match &group.functions {
                FunctionList::Names(names) => {
                    for name in names {
                        added += staged.register_entry(name, &group.group, &FunctionEntry::default())?;
                    }
                }
                FunctionList::Detailed(entries) => {
                    for (name, entry) in entries {
                        added += staged.register_entry(name, &group.group, entry)?;
                    }
                }
            }

            for (name, value) in &group.constants {
                if !staged.constants.contains_key(name) {
                    staged.constants.insert(name.clone(), value.clone());
                    added += 1;
                }
            }
        }

        *self = staged;
        debug!(added, total = self.len(), "registered function groups");
        Ok(added)
    }

    fn register_entry(&mut self, code: &str, group: &str, entry: &FunctionEntry) -> Result<usize, SandboxError> {
        if self.functions.contains_key(code) {
            trace!(code, "function already registered");
            return Ok(0);
        }
        if code.trim().is_empty() {
            return Err(SandboxError::Registration {
                message: format!("empty function code in group '{}'", group),
            });
        }

        let target = entry.function.as_deref().unwrap_or(code);
        let builtin = builtins::find(target).ok_or_else(|| SandboxError::Registration {
            message: format!(
                "no host builtin named '{}' for '{}'{}",
                target,
                code,
                suggest::hint(suggest::closest(target, builtins::names()))
            ),
        })?;

        let group = entry.group.as_deref().unwrap_or(group);
        self.insert_function(code, group, entry, builtin);
        Ok(1)
    }

    fn insert_function(&mut self, code: &str, group: &str, entry: &FunctionEntry, builtin: &'static Builtin) {
        self.functions.insert(
            code.to_string(),
            FunctionSpec {
                code: code.to_string(),
                group: group.to_string(),
                return_type: entry
                    .return_type
                    .clone()
                    .unwrap_or_else(|| builtin.return_type.to_string()),
                description: entry
                    .desc
                    .clone()
                    .unwrap_or_else(|| builtin.description.to_string()),
                args: entry.args.clone(),
                builtin,
            },
        );
    }
}

// ============================================================================
// Process-wide registry
// ============================================================================

lazy_static! {
    static ref GLOBAL: RwLock<Arc<Registry>> = RwLock::new(Arc::new(Registry::with_defaults()));
}

/// snapshot of the process-wide registry
pub fn global() -> Arc<Registry> {
    GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// extend the process-wide registry; existing snapshots are unaffected
pub fn register_global(groups: &[FunctionGroup]) -> Result<usize, SandboxError> {
    let mut guard = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);
    let mut next = Registry::clone(&guard);
    let added = next.register_groups(groups)?;
    if added > 0 {
        *guard = Arc::new(next);
    }
    Ok(added)
}
