// integration tests for the trans pipeline

use flowexpr::trans::{binding_key, bind, TransChain};
use flowexpr::{parse_value, Error, ExpressionItem, TransError};
use serde_json::json;

use crate::common::*;

#[test]
fn test_round_trip_binding() {
    let chain = "join(',').toArray().toJson()";
    let item = ExpressionItem::field("list").with_trans(chain);
    let source = data(json!({ "list": [1, 2, 3] }));

    let bound = bind(vec![&item], &source).unwrap();
    let key = binding_key("list", chain);
    assert_eq!(bound.get(&key), Some(&json!("[\"1,2,3\"]")));
    // the raw value stays untouched
    assert_eq!(bound.get("list"), Some(&json!([1, 2, 3])));
}

#[test]
fn test_round_trip_template() {
    let value = parse_value(&expression(vec![
        field_with_trans("list", "join(',').toArray().toJson()"),
        input("'xxx'"),
    ]))
    .unwrap()
    .unwrap();

    let result = value
        .get_result(&sandbox(), &data(json!({ "list": [1, 2, 3] })))
        .unwrap();
    assert_eq!(result, json!("[\"1,2,3\"]xxx"));
}

#[test]
fn test_binding_key_includes_component() {
    let item = ExpressionItem::field("items")
        .with_component("form1")
        .with_trans("count()");
    assert_eq!(item.trans_key(), Some(binding_key("form1.items", "count()")));

    let value = parse_value(&expression(vec![json!({
        "type": "fields",
        "value": "items",
        "component_id": "form1",
        "trans": "count()"
    })]))
    .unwrap()
    .unwrap();
    let result = value
        .get_result(&sandbox(), &data(json!({ "form1": { "items": ["a", "b"] } })))
        .unwrap();
    assert_eq!(result, json!(2));
}

#[test]
fn test_source_type_mismatch() {
    let value = parse_value(&expression(vec![field_with_trans("name", "count()")]))
        .unwrap()
        .unwrap();
    let err = value
        .get_result(&sandbox(), &data(json!({ "name": "abc" })))
        .unwrap_err();
    assert!(
        matches!(err, Error::Trans(TransError::SourceType { .. })),
        "got {err:?}"
    );
}

#[test]
fn test_unknown_step_suggests() {
    let err = TransChain::parse("toNumbr()").unwrap_err();
    assert!(err.to_string().contains("did you mean 'toNumber'"), "got {err}");
}

#[test]
fn test_chain_steps() {
    let chain = TransChain::parse("toArray().join('.').toString()").unwrap();
    assert_eq!(chain.steps().len(), 3);
    assert_eq!(chain.apply(json!("a")).unwrap(), json!("a"));
    assert_eq!(
        TransChain::parse("toArray()").unwrap().apply(json!(null)).unwrap(),
        json!([])
    );
    assert_eq!(
        TransChain::parse("toNumber()").unwrap().apply(json!("12")).unwrap(),
        json!("12")
    );
}

#[test]
fn test_to_number_binds_numeric_string() {
    let strict = |right: &str| {
        let definition = group(
            "AND",
            vec![compare(
                expression(vec![field_with_trans("n", "toNumber()")]),
                "equals",
                Some(expression(vec![input(right)])),
            )],
        );
        let sandbox = sandbox();
        flowexpr::parse_condition(&definition, &sandbox)
            .unwrap()
            .unwrap()
            .get_result(&sandbox, &data(json!({ "n": 12 })))
            .unwrap()
    };
    assert!(strict("'12'"));
    assert!(!strict("12"));
}
