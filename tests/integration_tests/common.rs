// shared utilities for integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use flowexpr::{Bindings, Sandbox};
use serde_json::{json, Value as JsonValue};

/// path of the binary built for this test run
pub fn flowexpr_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_flowexpr"))
}

/// run flowexpr against an isolated config path and capture output
pub fn run_flowexpr(args: &[&str], config_path: &Path) -> Output {
    Command::new(flowexpr_binary_path())
        .args(["--config", config_path.to_str().unwrap()])
        .args(args)
        .env_remove("FLOWEXPR_LOG")
        .output()
        .expect("Failed to run flowexpr")
}

/// parse the single JSON-RPC line printed on stdout
pub fn json_output(output: &Output) -> JsonValue {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).unwrap_or_else(|e| {
        panic!(
            "expected JSON output: {}\nstdout: {}\nstderr: {}",
            e,
            stdout,
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

pub fn sandbox() -> Sandbox {
    Sandbox::global()
}

pub fn data(value: JsonValue) -> Bindings {
    value.as_object().cloned().expect("bindings must be an object")
}

// ============================================================================
// builder JSON helpers
// ============================================================================

pub fn field(path: &str) -> JsonValue {
    json!({ "type": "fields", "value": path })
}

pub fn field_with_trans(path: &str, trans: &str) -> JsonValue {
    json!({ "type": "fields", "value": path, "trans": trans })
}

pub fn input(value: &str) -> JsonValue {
    json!({ "type": "input", "value": value })
}

pub fn method(name: &str, args: Vec<JsonValue>) -> JsonValue {
    json!({ "type": "methods", "value": name, "name": name, "args": args })
}

/// expression value over the given tokens
pub fn expression(items: Vec<JsonValue>) -> JsonValue {
    json!({ "type": "expression", "expression_value": items })
}

/// legacy constant made of one literal
pub fn constant(text: &str) -> JsonValue {
    json!({ "type": "const", "const_value": [input(text)] })
}

pub fn compare(left: JsonValue, condition: &str, right: Option<JsonValue>) -> JsonValue {
    let mut item = json!({
        "type": "compare",
        "left_operands": left,
        "condition": condition,
    });
    if let Some(right) = right {
        item["right_operands"] = right;
    }
    item
}

pub fn operation(operands: JsonValue) -> JsonValue {
    json!({ "type": "operation", "operands": operands })
}

pub fn group(ops: &str, children: Vec<JsonValue>) -> JsonValue {
    json!({ "ops": ops, "children": children })
}
