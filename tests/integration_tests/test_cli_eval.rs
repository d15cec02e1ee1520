// integration tests for eval, check, code and functions

use serde_json::{json, Value as JsonValue};
use std::fs;
use tempfile::TempDir;

use crate::common::*;

fn config_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("config.json")
}

fn doc(value: &JsonValue) -> String {
    serde_json::to_string(value).unwrap()
}

fn upper_name() -> JsonValue {
    expression(vec![method("upper", vec![expression(vec![field("name")])])])
}

fn adult() -> JsonValue {
    group(
        "AND",
        vec![compare(expression(vec![field("age")]), "gte", Some(constant("18")))],
    )
}

#[test]
fn test_eval_value_json() {
    let dir = TempDir::new().unwrap();
    let output = run_flowexpr(
        &["eval", &doc(&upper_name()), "--data", r#"{ name: "ada" }"#, "--json"],
        &config_path(&dir),
    );

    assert!(output.status.success());
    let json = json_output(&output);
    assert_eq!(json["jsonrpc"], "2.0");
    assert_eq!(json["result"]["kind"], "value");
    assert_eq!(json["result"]["result"], "ADA");
    assert!(json["result"]["code"].as_str().unwrap().contains("upper("));
}

#[test]
fn test_eval_condition_detected() {
    let dir = TempDir::new().unwrap();
    let definition = doc(&adult());

    let output = run_flowexpr(
        &["eval", &definition, "--data", r#"{"age": 20}"#, "--json"],
        &config_path(&dir),
    );
    let json = json_output(&output);
    assert_eq!(json["result"]["kind"], "condition");
    assert_eq!(json["result"]["result"], true);

    let output = run_flowexpr(
        &["eval", &definition, "--data", r#"{"age": 12}"#, "--no-json"],
        &config_path(&dir),
    );
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "false");
}

#[test]
fn test_eval_reads_files() {
    let dir = TempDir::new().unwrap();
    let def_path = dir.path().join("def.json");
    let data_path = dir.path().join("data.json5");
    fs::write(&def_path, doc(&upper_name())).unwrap();
    fs::write(&data_path, "{ name: 'grace', // trailing\n }").unwrap();

    let output = run_flowexpr(
        &[
            "eval",
            &format!("@{}", def_path.display()),
            "--data",
            &format!("@{}", data_path.display()),
            "--no-json",
        ],
        &config_path(&dir),
    );
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "GRACE");
}

#[test]
fn test_build_error_reports_path() {
    let dir = TempDir::new().unwrap();
    let definition = doc(&expression(vec![input("1"), json!({ "type": "loop" })]));

    let output = run_flowexpr(&["eval", &definition, "--json"], &config_path(&dir));
    assert_eq!(output.status.code(), Some(2));

    let json = json_output(&output);
    assert_eq!(json["error"]["code"], -32002);
    assert_eq!(json["error"]["data"]["path"], "expression_value[1].type");
}

#[test]
fn test_unknown_function_is_compile_error() {
    let dir = TempDir::new().unwrap();
    let definition = doc(&expression(vec![method("system", vec![constant("ls")])]));

    let output = run_flowexpr(&["check", &definition, "--json"], &config_path(&dir));
    assert_eq!(output.status.code(), Some(3));
    let json = json_output(&output);
    assert_eq!(json["error"]["code"], -32003);
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("unknown function 'system'"));
}

#[test]
fn test_lenient_coercion() {
    let dir = TempDir::new().unwrap();
    let mut def = expression(vec![field("value")]);
    def["data_type"] = json!("array");
    let definition = doc(&def);

    let output = run_flowexpr(
        &["eval", &definition, "--data", r#"{"value": "abc"}"#, "--json"],
        &config_path(&dir),
    );
    assert_eq!(output.status.code(), Some(5));

    let output = run_flowexpr(
        &["eval", &definition, "--data", r#"{"value": "abc"}"#, "--json", "--lenient"],
        &config_path(&dir),
    );
    assert!(output.status.success());
    assert_eq!(json_output(&output)["result"]["result"], JsonValue::Null);
}

#[test]
fn test_check_and_code() {
    let dir = TempDir::new().unwrap();
    let definition = doc(&adult());

    let output = run_flowexpr(&["check", &definition, "--no-json"], &config_path(&dir));
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("condition is valid"));

    let output = run_flowexpr(&["code", &definition, "--no-json"], &config_path(&dir));
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "(((data['age']) >= (18)))"
    );

    let output = run_flowexpr(&["code", &definition, "--json"], &config_path(&dir));
    let json = json_output(&output);
    assert_eq!(json["result"]["valid"], true);
    assert_eq!(json["result"]["code"], "(((data['age']) >= (18)))");
}

#[test]
fn test_quiet_suppresses_output() {
    let dir = TempDir::new().unwrap();
    let output = run_flowexpr(&["check", &doc(&adult()), "--quiet"], &config_path(&dir));
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_functions_listing() {
    let dir = TempDir::new().unwrap();

    let output = run_flowexpr(&["functions", "--group", "math", "--names"], &config_path(&dir));
    assert!(output.status.success());
    let names: Vec<String> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect();
    assert!(names.contains(&"abs".to_string()));
    assert!(!names.contains(&"upper".to_string()));

    let output = run_flowexpr(&["functions", "--json"], &config_path(&dir));
    let json = json_output(&output);
    let constants = json["result"]["constants"].as_array().unwrap();
    assert!(constants.iter().any(|c| c["name"] == "PI"));
}

#[test]
fn test_functions_with_extra_file() {
    let dir = TempDir::new().unwrap();
    let fns = dir.path().join("fns.json5");
    fs::write(
        &fns,
        "{ group: 'alias', functions: { shout: { function: 'upper', args: ['text'] } } }",
    )
    .unwrap();
    let fns = fns.to_str().unwrap();

    let output = run_flowexpr(
        &["functions", "--functions", fns, "--group", "alias", "--format", "{code}({args}) -> {builtin}"],
        &config_path(&dir),
    );
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "shout(text) -> upper"
    );

    let shout = doc(&expression(vec![method("shout", vec![constant("hey")])]));
    let output = run_flowexpr(&["eval", &shout, "--functions", fns, "--json"], &config_path(&dir));
    assert_eq!(json_output(&output)["result"]["result"], "HEY");
}
