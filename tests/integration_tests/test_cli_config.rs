// integration tests for config management

use serde_json::{json, Value as JsonValue};
use std::fs;
use tempfile::TempDir;

use crate::common::*;

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_config_path_uses_flag() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.json");

    let output = run_flowexpr(&["config", "path"], &path);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), path.display().to_string());
}

#[test]
fn test_config_show_defaults_without_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    let output = run_flowexpr(&["config", "show"], &path);
    assert!(output.status.success());
    let shown: JsonValue = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(shown["settings"]["strict"], true);
    // showing never creates the file
    assert!(!path.exists());
}

#[test]
fn test_config_set_and_reset() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let output = run_flowexpr(&["config", "set", "settings.strict", "off"], &path);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Set settings.strict = off"));

    let saved: JsonValue = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["settings"]["strict"], false);

    let output = run_flowexpr(&["config", "reset"], &path);
    assert!(output.status.success());
    let saved: JsonValue = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["settings"]["strict"], true);
}

#[test]
fn test_config_set_rejects_unknown_key() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    let output = run_flowexpr(&["config", "set", "settings.strictly", "true", "--json"], &path);
    assert_eq!(output.status.code(), Some(7));
    let json = json_output(&output);
    assert_eq!(json["error"]["code"], -32007);
    assert!(!path.exists());
}

#[test]
fn test_non_strict_config_yields_null() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, "{ settings: { strict: false } }").unwrap();

    let mut def = expression(vec![field("value")]);
    def["data_type"] = json!("array");
    let definition = serde_json::to_string(&def).unwrap();

    let output = run_flowexpr(
        &["eval", &definition, "--data", r#"{"value": "abc"}"#, "--json"],
        &path,
    );
    assert!(output.status.success());
    assert_eq!(json_output(&output)["result"]["result"], JsonValue::Null);
}

#[test]
fn test_config_function_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(
        dir.path().join("fns.json"),
        r#"[{ "group": "alias", "functions": { "shout": { "function": "upper" } }, "constants": { "TAX": 0.2 } }]"#,
    )
    .unwrap();

    let output = run_flowexpr(&["config", "set", "function_files", "fns.json"], &path);
    assert!(output.status.success());

    let output = run_flowexpr(&["config", "verify"], &path);
    assert!(output.status.success(), "{}", stdout(&output));
    assert!(stdout(&output).contains("Configuration is valid"));

    let output = run_flowexpr(&["functions", "--group", "alias", "--names"], &path);
    assert_eq!(stdout(&output).trim(), "shout");
}

#[test]
fn test_config_verify_reports_errors() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{ "function_files": ["missing.json"] }"#).unwrap();

    let output = run_flowexpr(&["config", "verify"], &path);
    assert!(!output.status.success());
    let text = stdout(&output);
    assert!(text.contains("1 error(s)"));
    assert!(text.contains("function_files[0]"));
}

#[test]
fn test_broken_function_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(dir.path().join("bad.json"), r#"[{ "group": "x", "functions": ["uper"] }]"#).unwrap();
    fs::write(&path, r#"{ "function_files": ["bad.json"] }"#).unwrap();

    let definition = serde_json::to_string(&expression(vec![input("1")])).unwrap();
    let output = run_flowexpr(&["eval", &definition, "--json"], &path);
    assert_eq!(output.status.code(), Some(7));
    let json = json_output(&output);
    assert!(json["error"]["data"]["details"]
        .as_str()
        .unwrap()
        .contains("did you mean 'upper'"));
}
