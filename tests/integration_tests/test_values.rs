// integration tests for value building, code generation and resolution

use flowexpr::{parse_value, CompileError, DataType, Error};
use serde_json::json;

use crate::common::*;

#[test]
fn test_literal_quoting() {
    let cases = [("123", "123"), ("abc", "'abc'"), ("it's", r"'it\'s'"), ("1 2", "'1 2'")];
    for (text, expected) in cases {
        let value = parse_value(&constant(text)).unwrap().unwrap();
        assert_eq!(value.code().unwrap(), expected, "quoting {text}");
    }
}

#[test]
fn test_legacy_constant_bypasses_sandbox() {
    // an empty registry would reject any call
    let sandbox = flowexpr::Sandbox::new(std::sync::Arc::new(flowexpr::Registry::new()));
    let value = parse_value(&constant("42")).unwrap().unwrap();
    assert!(value.is_legacy_constant());
    assert_eq!(value.get_result(&sandbox, &data(json!({}))).unwrap(), json!(42));
}

#[test]
fn test_template_concatenation() {
    let value = parse_value(&expression(vec![
        input("'Hello, '"),
        field("user.name"),
        input("'!'"),
    ]))
    .unwrap()
    .unwrap();

    assert_eq!(value.code().unwrap(), "'Hello, ' . data['user']['name'] . '!'");
    let result = value
        .get_result(&sandbox(), &data(json!({ "user": { "name": "Ann" } })))
        .unwrap();
    assert_eq!(result, json!("Hello, Ann!"));
}

#[test]
fn test_method_call_with_nested_args() {
    let value = parse_value(&expression(vec![method(
        "upper",
        vec![expression(vec![field("name")])],
    )]))
    .unwrap()
    .unwrap();

    assert_eq!(value.code().unwrap(), "upper((data['name']))");
    assert_eq!(
        value.get_result(&sandbox(), &data(json!({ "name": "bob" }))).unwrap(),
        json!("BOB")
    );
}

#[test]
fn test_noop_argument_collapses_to_zero_arg_call() {
    let value = parse_value(&expression(vec![method(
        "PI",
        vec![expression(vec![json!({ "type": "methods", "value": "" })])],
    )]))
    .unwrap()
    .unwrap();

    assert_eq!(value.code().unwrap(), "PI()");
    let result = value.get_result(&sandbox(), &data(json!({}))).unwrap();
    assert!((result.as_f64().unwrap() - std::f64::consts::PI).abs() < 1e-12);
}

#[test]
fn test_unknown_function_is_rejected() {
    let value = parse_value(&expression(vec![method("exec", vec![constant("ls")])]))
        .unwrap()
        .unwrap();

    let sandbox = sandbox();
    let err = value.get_result(&sandbox, &data(json!({}))).unwrap_err();
    assert!(matches!(err, Error::Sandbox(_)), "got {err:?}");
    assert_eq!(sandbox.live_sessions(), 0);
}

#[test]
fn test_array_coercion() {
    let mut def = expression(vec![field("value")]);
    def["data_type"] = json!("array");
    let value = parse_value(&def).unwrap().unwrap();
    assert_eq!(value.data_type(), Some(DataType::Array));

    let err = value
        .get_result(&sandbox(), &data(json!({ "value": "abc" })))
        .unwrap_err();
    assert!(matches!(err, Error::Coercion(_)), "got {err:?}");

    let result = value
        .get_result(&sandbox(), &data(json!({ "value": [1, 2] })))
        .unwrap();
    assert_eq!(result, json!([1, 2]));

    let lenient = value
        .get_result_non_strict(&sandbox(), &data(json!({ "value": "abc" })))
        .unwrap();
    assert_eq!(lenient, json!(null));
}

#[test]
fn test_number_and_boolean_coercion() {
    let mut def = expression(vec![field("n")]);
    def["data_type"] = json!("integer");
    let value = parse_value(&def).unwrap().unwrap();
    assert_eq!(value.data_type(), Some(DataType::Number));
    assert_eq!(
        value.get_result(&sandbox(), &data(json!({ "n": "12" }))).unwrap(),
        json!(12)
    );

    let mut def = expression(vec![field("flag")]);
    def["data_type"] = json!("boolean");
    let value = parse_value(&def).unwrap().unwrap();
    assert_eq!(
        value.get_result(&sandbox(), &data(json!({ "flag": "false" }))).unwrap(),
        json!(false)
    );
}

#[test]
fn test_display_tokens_resolve_from_payload() {
    let value = parse_value(&expression(vec![json!({
        "type": "checkbox",
        "checkbox_value": "true"
    })]))
    .unwrap()
    .unwrap();
    assert_eq!(value.get_result(&sandbox(), &data(json!({}))).unwrap(), json!(true));

    let value = parse_value(&expression(vec![json!({
        "type": "member",
        "member_value": [
            { "type": "member", "value": "u1" },
            { "type": "field", "value": expression(vec![field("owners")]) }
        ]
    })]))
    .unwrap()
    .unwrap();

    let result = value
        .get_result(&sandbox(), &data(json!({ "owners": ["u2", "u3"] })))
        .unwrap();
    assert_eq!(result, json!(["u1", "u2", "u3"]));

    // field references cannot be lowered without bindings
    assert!(matches!(
        value.code(),
        Err(CompileError::UnsupportedItem { .. })
    ));
}

#[test]
fn test_blank_boundary_inputs_are_pruned() {
    let value = parse_value(&expression(vec![input(""), field("a"), input(" ")]))
        .unwrap()
        .unwrap();
    assert_eq!(value.code().unwrap(), "data['a']");

    assert!(parse_value(&expression(vec![input("")])).unwrap().is_none());
    assert!(parse_value(&json!({})).unwrap().is_none());
}

#[test]
fn test_build_error_path() {
    let err = parse_value(&expression(vec![field("a"), json!({ "type": "widget" })])).unwrap_err();
    assert_eq!(err.path, "expression_value[1].type");
}

#[test]
fn test_raw_code_renders_what_runs() {
    let value = parse_value(&expression(vec![input("'a' . data['b']")]))
        .unwrap()
        .unwrap();
    assert_eq!(value.code().unwrap(), "'a' . data['b']");
    assert_eq!(
        value.get_result(&sandbox(), &data(json!({ "b": "c" }))).unwrap(),
        json!("ac")
    );

    let value = parse_value(&expression(vec![input("1 + 2")])).unwrap().unwrap();
    assert!(matches!(value.code(), Err(CompileError::UnsupportedItem { .. })));
    let err = value.get_result(&sandbox(), &data(json!({}))).unwrap_err();
    assert!(matches!(err, Error::Compile(_)), "got {err:?}");
}

#[test]
fn test_substr_with_huge_length() {
    let value = parse_value(&expression(vec![method(
        "substr",
        vec![constant("abc"), constant("1"), constant("1000000000000000000000000000000")],
    )]))
    .unwrap()
    .unwrap();
    assert_eq!(value.get_result(&sandbox(), &data(json!({}))).unwrap(), json!("bc"));
}
