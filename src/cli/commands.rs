use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value as JsonValue;

use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::compiler;
use crate::conditions::{self, Condition};
use crate::config::{self, Config};
use crate::error::{BuildError, Error as FlowError};
use crate::expression::{self, Value};
use crate::sandbox::{Registry, Sandbox, SandboxError};
use crate::scalar::Bindings;

use super::exit_codes;
use super::output::{
    self, CodeData, ConstantData, ErrorData, EvalData, FunctionData, FunctionsData, OutputMode,
};

#[derive(Parser)]
#[command(name = "flowexpr")]
#[command(about = "Evaluate workflow values and branch conditions in a whitelisted sandbox")]
#[command(version)]
pub struct Cli {
    /// Path to config file (overrides FLOWEXPR_CONFIG env var and default location)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (auto-enabled when stdout is piped)
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Force text output even when stdout is piped
    #[arg(long, global = true, conflicts_with = "json")]
    pub no_json: bool,

    /// Suppress all output on success (errors still go to stderr)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Extra function whitelist file, registered after the configured ones
    #[arg(long = "functions", global = true, action = clap::ArgAction::Append)]
    pub functions: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a value or condition definition against data
    Eval {
        /// Definition as inline JSON5, @file, or - for stdin
        definition: String,

        /// Data bindings as inline JSON5 or @file
        #[arg(short, long)]
        data: Option<String>,

        /// Definition kind (detected from its shape by default)
        #[arg(short, long, value_enum, default_value_t = Kind::Auto)]
        kind: Kind,

        /// Yield null instead of failing when a result does not fit its data type
        #[arg(long)]
        lenient: bool,
    },

    /// Validate a definition against the function whitelist
    Check {
        /// Definition as inline JSON5, @file, or - for stdin
        definition: String,

        #[arg(short, long, value_enum, default_value_t = Kind::Auto)]
        kind: Kind,
    },

    /// Print the code generated for a definition
    Code {
        /// Definition as inline JSON5, @file, or - for stdin
        definition: String,

        #[arg(short, long, value_enum, default_value_t = Kind::Auto)]
        kind: Kind,
    },

    /// List whitelisted functions and constants
    Functions {
        /// Only show this group
        #[arg(short, long)]
        group: Option<String>,

        /// Output one function code per line
        #[arg(long, conflicts_with = "format")]
        names: bool,

        /// Custom output format using {field} placeholders (e.g., "{code} ({group})")
        #[arg(long)]
        format: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Show configuration file path
    Path,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "settings.strict")
        key: String,
        /// Value to set
        value: String,
    },
    /// Reset configuration to defaults
    Reset,
    /// Verify configuration file and its function files
    Verify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Kind {
    /// condition when the document has `children` or `ops`, value otherwise
    Auto,
    Value,
    Condition,
}

/// marks failures of the configuration layer
#[derive(Debug)]
struct ConfigFailure(String);

impl fmt::Display for ConfigFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

enum Definition {
    Value(Value),
    Condition(Condition),
}

impl Definition {
    fn kind(&self) -> &'static str {
        match self {
            Definition::Value(_) => "value",
            Definition::Condition(_) => "condition",
        }
    }

    /// compile and check against the sandbox, returning the generated code
    fn check(&self, sandbox: &Sandbox) -> Result<String, FlowError> {
        match self {
            Definition::Value(value) => {
                let program = compiler::compile_value(value)?;
                sandbox.check(&program)?;
                Ok(program.code())
            }
            Definition::Condition(cond) => Ok(cond.validate(sandbox)?.code()),
        }
    }
}

pub fn execute(cli: Cli) -> Result<()> {
    let output_mode = OutputMode::from_flags(cli.json, cli.no_json, cli.quiet, false, false);

    match run(cli, output_mode) {
        Ok(()) => Ok(()),
        Err(e) if output_mode.is_json() => {
            let code = exit_code(&e);
            output::print_json_error(code, &e.to_string(), error_data(&e));
            std::process::exit(code);
        }
        Err(e) => Err(e),
    }
}

fn run(cli: Cli, output_mode: OutputMode) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => config::get_config_path().map_err(|e| e.context(config_failure("no config path")))?,
    };

    match cli.command {
        Commands::Eval {
            definition,
            data,
            kind,
            lenient,
        } => {
            let config = load_config(&config_path)?;
            let sandbox = build_sandbox(&config, &config_path, &cli.functions)?;
            let definition = parse_definition(&read_document(&definition)?, kind, &sandbox)?;
            let data = match data {
                Some(data) => parse_bindings(&read_document(&data)?)?,
                None => Bindings::new(),
            };
            let strict = config.settings.strict && !lenient;

            // member lists with field references only resolve against data
            let code = match &definition {
                Definition::Value(value) => value.code().ok(),
                Definition::Condition(cond) => Some(cond.code()?),
            };
            let result = match &definition {
                Definition::Value(value) => value.resolve(&sandbox, &data, strict)?,
                Definition::Condition(cond) => JsonValue::Bool(cond.get_result(&sandbox, &data)?),
            };

            if output_mode.is_json() {
                output::print_json(&EvalData {
                    kind: definition.kind(),
                    code,
                    result,
                });
            } else if !output_mode.is_quiet() {
                println!("{}", output::format_value(&result));
            }
            Ok(())
        }

        Commands::Check { definition, kind } => {
            let (definition, code) =
                compile_definition(&definition, kind, &config_path, &cli.functions)?;

            if output_mode.is_json() {
                output::print_json(&CodeData {
                    kind: definition.kind(),
                    code,
                    valid: true,
                });
            } else if !output_mode.is_quiet() {
                println!("✓ {} is valid", definition.kind());
            }
            Ok(())
        }

        Commands::Code { definition, kind } => {
            let (definition, code) =
                compile_definition(&definition, kind, &config_path, &cli.functions)?;

            if output_mode.is_json() {
                output::print_json(&CodeData {
                    kind: definition.kind(),
                    code,
                    valid: true,
                });
            } else if !output_mode.is_quiet() {
                println!("{}", code);
            }
            Ok(())
        }

        Commands::Functions {
            group,
            names,
            format,
        } => {
            let config = load_config(&config_path)?;
            let registry = config::build_registry(&config, &config_path, &cli.functions)
                .map_err(|e| e.context(config_failure("failed to load function files")))?;
            let mode = OutputMode::from_flags(
                cli.json,
                cli.no_json,
                cli.quiet,
                names,
                format.is_some(),
            );
            print_functions(&registry, group.as_deref(), mode, format.as_deref());
            Ok(())
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let config = load_config(&config_path)?;
                let json =
                    serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
                println!("{}", json);
                Ok(())
            }
            ConfigCommands::Path => {
                println!("{}", config_path.display());
                Ok(())
            }
            ConfigCommands::Set { key, value } => {
                let mut config = load_config(&config_path)?;
                config::set_value(&mut config, &key, &value)
                    .map_err(|e| e.context(config_failure("invalid config value")))?;
                config::save_to(&config, &config_path)?;
                if !output_mode.is_quiet() {
                    println!("Set {} = {}", key, value);
                }
                Ok(())
            }
            ConfigCommands::Reset => {
                config::save_to(&Config::default(), &config_path)?;
                if !output_mode.is_quiet() {
                    println!("Configuration reset to defaults");
                }
                Ok(())
            }
            ConfigCommands::Verify => {
                let errors = config::verify(&config_path)
                    .map_err(|e| e.context(config_failure("configuration could not be read")))?;

                if errors.is_empty() {
                    println!("✓ Configuration is valid: {}", config_path.display());
                    Ok(())
                } else {
                    println!(
                        "✗ Configuration has {} error(s): {}",
                        errors.len(),
                        config_path.display()
                    );
                    println!();
                    for error in &errors {
                        println!("  - {}", error);
                    }
                    Err(anyhow::Error::msg(config_failure(
                        "configuration validation failed",
                    )))
                }
            }
        },
    }
}

/// parse and sandbox-check a definition, returning it with its code
fn compile_definition(
    arg: &str,
    kind: Kind,
    config_path: &Path,
    extra: &[PathBuf],
) -> Result<(Definition, String)> {
    let config = load_config(config_path)?;
    let sandbox = build_sandbox(&config, config_path, extra)?;
    let definition = parse_definition(&read_document(arg)?, kind, &sandbox)?;
    let code = definition.check(&sandbox)?;
    Ok((definition, code))
}

fn config_failure(message: &str) -> ConfigFailure {
    ConfigFailure(message.to_string())
}

fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    config::load_from(path).map_err(|e| e.context(config_failure("failed to load config")))
}

fn build_sandbox(config: &Config, config_path: &Path, extra: &[PathBuf]) -> Result<Sandbox> {
    config::build_sandbox(config, config_path, extra)
        .map_err(|e| e.context(config_failure("failed to load function files")))
}

/// read a JSON5 document given inline, as `@file`, or `-` for stdin
fn read_document(arg: &str) -> Result<JsonValue> {
    let content = if arg == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else if let Some(path) = arg.strip_prefix('@') {
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?
    } else {
        arg.to_string()
    };

    json5::from_str(&content).context("Invalid JSON document")
}

fn parse_bindings(json: &JsonValue) -> Result<Bindings> {
    match json {
        JsonValue::Object(map) => Ok(map.clone()),
        JsonValue::Null => Ok(Bindings::new()),
        _ => Err(anyhow!("data must be a JSON object")),
    }
}

fn detect_kind(json: &JsonValue) -> Kind {
    match json {
        JsonValue::Object(obj) if obj.contains_key("children") || obj.contains_key("ops") => {
            Kind::Condition
        }
        _ => Kind::Value,
    }
}

fn parse_definition(json: &JsonValue, kind: Kind, sandbox: &Sandbox) -> Result<Definition> {
    let kind = match kind {
        Kind::Auto => detect_kind(json),
        other => other,
    };

    let definition = match kind {
        Kind::Condition => conditions::parse_condition(json, sandbox)?
            .map(Definition::Condition)
            .ok_or_else(|| BuildError::new("condition has no effective children", ""))?,
        _ => expression::parse_value(json)?
            .map(Definition::Value)
            .ok_or_else(|| BuildError::new("value has no tokens", ""))?,
    };
    Ok(definition)
}

fn exit_code(e: &anyhow::Error) -> i32 {
    if e.downcast_ref::<ConfigFailure>().is_some() {
        return exit_codes::CONFIG_ERROR;
    }
    match e.downcast_ref::<FlowError>() {
        Some(FlowError::Build(_)) => exit_codes::BUILD_ERROR,
        Some(FlowError::Compile(_)) => exit_codes::COMPILE_ERROR,
        Some(FlowError::Sandbox(SandboxError::Execution { .. })) => exit_codes::EXECUTION_ERROR,
        Some(FlowError::Sandbox(_)) => exit_codes::COMPILE_ERROR,
        Some(FlowError::Coercion(_)) => exit_codes::COERCION_ERROR,
        Some(FlowError::Trans(_)) => exit_codes::TRANS_ERROR,
        None if e.downcast_ref::<BuildError>().is_some() => exit_codes::BUILD_ERROR,
        None => exit_codes::ERROR,
    }
}

fn error_data(e: &anyhow::Error) -> ErrorData {
    let path = match e.downcast_ref::<FlowError>() {
        Some(FlowError::Build(b)) => Some(b.path.clone()),
        _ => e.downcast_ref::<BuildError>().map(|b| b.path.clone()),
    };
    let causes: Vec<String> = e.chain().skip(1).map(|c| c.to_string()).collect();

    ErrorData {
        path: path.filter(|p| !p.is_empty()),
        details: (!causes.is_empty()).then(|| causes.join(": ")),
    }
}

fn function_data(registry: &Registry, group: Option<&str>) -> Vec<FunctionData> {
    registry
        .functions()
        .filter(|f| group.map_or(true, |g| f.group == g))
        .map(|f| FunctionData {
            code: f.code.clone(),
            group: f.group.clone(),
            return_type: f.return_type.clone(),
            description: f.description.clone(),
            args: f.args.iter().map(|a| a.name().to_string()).collect(),
            builtin: (f.builtin.name != f.code).then(|| f.builtin.name.to_string()),
        })
        .collect()
}

fn print_functions(registry: &Registry, group: Option<&str>, mode: OutputMode, format: Option<&str>) {
    let functions = function_data(registry, group);
    // constants have no group, only listed when unfiltered
    let constants: Vec<ConstantData> = match group {
        Some(_) => Vec::new(),
        None => registry
            .constants()
            .map(|(name, value)| ConstantData {
                name: name.clone(),
                value: value.clone(),
            })
            .collect(),
    };

    match mode {
        OutputMode::Quiet => {}
        OutputMode::Json => output::print_json(&FunctionsData {
            functions,
            constants,
        }),
        OutputMode::Names => {
            for f in &functions {
                println!("{}", f.code);
            }
        }
        OutputMode::Format => {
            let template = format.unwrap_or("{code}");
            for f in &functions {
                println!("{}", output::format_template(template, f));
            }
        }
        OutputMode::Text => {
            let mut current = None;
            for f in &functions {
                if current != Some(f.group.as_str()) {
                    println!("{}:", f.group);
                    current = Some(f.group.as_str());
                }
                println!(
                    "  {}({}) -> {}  {}",
                    f.code,
                    f.args.join(", "),
                    f.return_type,
                    f.description
                );
            }
            if !constants.is_empty() {
                println!("constants:");
                for c in &constants {
                    println!("  {} = {}", c.name, c.value);
                }
            }
        }
    }
}
