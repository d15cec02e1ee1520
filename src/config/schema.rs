use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    /// whitelist files registered on top of the default functions,
    /// relative paths resolve against the config file's directory
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub function_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// fail on data type mismatches instead of yielding null
    #[serde(default = "default_strict")]
    pub strict: bool,
}

fn default_strict() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self { strict: true }
    }
}
