// integration tests for condition building, code generation and evaluation

use flowexpr::{parse_condition, CompileError, Error};
use serde_json::json;

use crate::common::*;

fn sample() -> serde_json::Value {
    group(
        "AND",
        vec![
            compare(expression(vec![input("'haha'")]), "gt", Some(expression(vec![input("2")]))),
            group(
                "OR",
                vec![
                    operation(expression(vec![field("success")])),
                    compare(
                        expression(vec![input("2")]),
                        "equals",
                        Some(expression(vec![input("'2'")])),
                    ),
                ],
            ),
        ],
    )
}

#[test]
fn test_and_or_grouping() {
    let sandbox = sandbox();
    let cond = parse_condition(&sample(), &sandbox).unwrap().unwrap();

    assert_eq!(
        cond.code().unwrap(),
        "((('haha') > (2)) && ((data['success']) || ((2) === ('2'))))"
    );
    assert!(cond.get_result(&sandbox, &data(json!({ "success": true }))).unwrap());
    assert!(!cond.get_result(&sandbox, &data(json!({ "success": false }))).unwrap());
}

#[test]
fn test_equality_selection() {
    let sandbox = sandbox();
    let loose = parse_condition(
        &group("AND", vec![compare(expression(vec![field("xxx")]), "==", Some(constant("123")))]),
        &sandbox,
    )
    .unwrap()
    .unwrap();
    assert_eq!(loose.code().unwrap(), "(((data['xxx']) == (123)))");
    assert!(loose.get_result(&sandbox, &data(json!({ "xxx": "123" }))).unwrap());

    let strict = parse_condition(
        &group("AND", vec![compare(expression(vec![field("xxx")]), "==", Some(constant("abc")))]),
        &sandbox,
    )
    .unwrap()
    .unwrap();
    assert_eq!(strict.code().unwrap(), "(((data['xxx']) === ('abc')))");
}

#[test]
fn test_empty_treats_missing_and_empty_array_as_unset() {
    let sandbox = sandbox();
    let cond = parse_condition(
        &group("AND", vec![compare(expression(vec![field("a.b")]), "empty", None)]),
        &sandbox,
    )
    .unwrap()
    .unwrap();

    assert_eq!(cond.code().unwrap(), "((!isset(data['a']['b'])))");
    assert!(cond.get_result(&sandbox, &data(json!({}))).unwrap());
    assert!(cond.get_result(&sandbox, &data(json!({ "a": { "b": [] } }))).unwrap());
    assert!(!cond.get_result(&sandbox, &data(json!({ "a": { "b": [1] } }))).unwrap());
}

#[test]
fn test_valuable_coalesces_to_blank() {
    let sandbox = sandbox();
    let cond = parse_condition(
        &group("AND", vec![compare(expression(vec![field("a.b")]), "valuable", None)]),
        &sandbox,
    )
    .unwrap()
    .unwrap();

    assert!(cond.get_result(&sandbox, &data(json!({ "a": { "b": [] } }))).unwrap());
    assert!(cond.get_result(&sandbox, &data(json!({ "a": { "b": "" } }))).unwrap());
    assert!(!cond.get_result(&sandbox, &data(json!({ "a": { "b": "x" } }))).unwrap());

    let inverse = parse_condition(
        &group("AND", vec![compare(expression(vec![field("a.b")]), "no_valuable", None)]),
        &sandbox,
    )
    .unwrap()
    .unwrap();
    assert!(inverse.get_result(&sandbox, &data(json!({ "a": { "b": "x" } }))).unwrap());
}

#[test]
fn test_pure_literal_folding() {
    let sandbox = sandbox();
    let cond = parse_condition(
        &group(
            "OR",
            vec![
                compare(constant("0"), "not_empty", None),
                compare(expression(vec![input("'[]'")]), "not_empty", None),
            ],
        ),
        &sandbox,
    )
    .unwrap()
    .unwrap();

    assert_eq!(cond.code().unwrap(), "((false) || (false))");
    assert!(!cond.get_result(&sandbox, &data(json!({}))).unwrap());
}

#[test]
fn test_contains_operators() {
    let sandbox = sandbox();
    let cond = parse_condition(
        &group(
            "AND",
            vec![
                compare(expression(vec![field("tags")]), "contains", Some(constant("vip"))),
                compare(expression(vec![field("name")]), "not_contains", Some(constant("test"))),
            ],
        ),
        &sandbox,
    )
    .unwrap()
    .unwrap();

    let bindings = data(json!({ "tags": ["new", "vip"], "name": "alice" }));
    assert!(cond.get_result(&sandbox, &bindings).unwrap());

    let bindings = data(json!({ "tags": ["new"], "name": "alice" }));
    assert!(!cond.get_result(&sandbox, &bindings).unwrap());
}

#[test]
fn test_method_inside_condition() {
    let sandbox = sandbox();
    let cond = parse_condition(
        &group(
            "AND",
            vec![compare(
                expression(vec![method("strlen", vec![expression(vec![field("code")])])]),
                ">=",
                Some(constant("3")),
            )],
        ),
        &sandbox,
    )
    .unwrap()
    .unwrap();

    assert!(cond.get_result(&sandbox, &data(json!({ "code": "abcd" }))).unwrap());
    assert!(!cond.get_result(&sandbox, &data(json!({ "code": "ab" }))).unwrap());
}

#[test]
fn test_ineffective_condition_is_rejected() {
    let err = parse_condition(
        &group("AND", vec![operation(expression(vec![method("eval", vec![constant("1")])]))]),
        &sandbox(),
    )
    .unwrap_err();

    match err {
        Error::Compile(CompileError::Ineffective { reason }) => {
            assert!(reason.contains("unknown function 'eval'"), "reason: {reason}");
        }
        other => panic!("expected Ineffective, got {other:?}"),
    }
}

#[test]
fn test_missing_right_operand_path() {
    let err = parse_condition(
        &group(
            "AND",
            vec![
                operation(expression(vec![field("a")])),
                group("OR", vec![compare(expression(vec![field("b")]), "lt", None)]),
            ],
        ),
        &sandbox(),
    )
    .unwrap_err();

    match err {
        Error::Build(e) => assert_eq!(e.path, "children[1].children[0].right_operands"),
        other => panic!("expected build error, got {other:?}"),
    }
}

#[test]
fn test_sessions_released_after_evaluation() {
    let sandbox = sandbox();
    let cond = parse_condition(&sample(), &sandbox).unwrap().unwrap();
    for success in [true, false] {
        cond.get_result(&sandbox, &data(json!({ "success": success }))).unwrap();
    }
    assert_eq!(sandbox.live_sessions(), 0);
}
