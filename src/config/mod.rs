mod schema;

pub use schema::{Config, Settings};

use anyhow::{anyhow, Context, Result};
use serde_json::Value as JsonValue;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::sandbox::{FunctionGroup, Registry, Sandbox};

const CONFIG_ENV_VAR: &str = "FLOWEXPR_CONFIG";

pub fn get_config_path() -> Result<PathBuf> {
    if let Ok(path) = env::var(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }

    Ok(dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not find home directory"))?
        .join(".flowexpr")
        .join("config.json"))
}

/// load the active config; a missing file yields the defaults
pub fn load() -> Result<Config> {
    let path = get_config_path()?;
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    load_from(&path)
}

pub fn load_from(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = json5::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

pub fn save(config: &Config) -> Result<()> {
    save_to(config, &get_config_path()?)
}

pub fn save_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    Ok(())
}

/// Verify configuration file and return a list of errors
pub fn verify(path: &Path) -> Result<Vec<String>> {
    let mut errors = Vec::new();

    if !path.exists() {
        return Err(anyhow!("config file not found: {}", path.display()));
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: Config = match json5::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            return Err(anyhow!("invalid JSON: {}", e));
        }
    };

    // every whitelist file must load and register against the defaults
    let mut registry = Registry::with_defaults();
    for (i, file) in config.function_files.iter().enumerate() {
        let prefix = format!("function_files[{}]", i);
        let file = resolve_path(path, file);

        let groups = match load_function_groups(&file) {
            Ok(groups) => groups,
            Err(e) => {
                errors.push(format!("{}: {:#}", prefix, e));
                continue;
            }
        };

        if let Err(e) = registry.register_groups(&groups) {
            errors.push(format!("{}: {}", prefix, e));
        }
    }

    Ok(errors)
}

pub fn set_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["settings", "strict"] => {
            config.settings.strict = parse_bool(value)?;
        }
        ["function_files"] => {
            config.function_files = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect();
        }
        _ => {
            return Err(anyhow!(
                "Unknown config key: {}. Valid keys: settings.strict, function_files",
                key
            ));
        }
    }

    Ok(())
}

/// parse a whitelist file holding one group or an array of groups
pub fn load_function_groups(path: &Path) -> Result<Vec<FunctionGroup>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read function file: {}", path.display()))?;

    let json: JsonValue = json5::from_str(&content)
        .with_context(|| format!("Failed to parse function file: {}", path.display()))?;

    let groups = match json {
        JsonValue::Array(_) => serde_json::from_value(json),
        single => serde_json::from_value(single).map(|group| vec![group]),
    }
    .with_context(|| format!("Invalid function groups in {}", path.display()))?;

    Ok(groups)
}

/// default whitelist extended with the configured function files
///
/// `config_path` anchors relative file paths.
pub fn build_registry(config: &Config, config_path: &Path, extra: &[PathBuf]) -> Result<Registry> {
    let mut registry = Registry::with_defaults();

    let files = config
        .function_files
        .iter()
        .map(|file| resolve_path(config_path, file))
        .chain(extra.iter().cloned());

    for file in files {
        let groups = load_function_groups(&file)?;
        let added = registry
            .register_groups(&groups)
            .with_context(|| format!("Failed to register functions from {}", file.display()))?;
        debug!(file = %file.display(), added, "registered function file");
    }

    Ok(registry)
}

pub fn build_sandbox(config: &Config, config_path: &Path, extra: &[PathBuf]) -> Result<Sandbox> {
    Ok(Sandbox::new(Arc::new(build_registry(config, config_path, extra)?)))
}

fn resolve_path(config_path: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        return file.to_path_buf();
    }
    config_path
        .parent()
        .map(|dir| dir.join(file))
        .unwrap_or_else(|| file.to_path_buf())
}

pub(crate) fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(anyhow!(
            "Invalid boolean value: {}. Use true/false, yes/no, 1/0, or on/off",
            value
        )),
    }
}
