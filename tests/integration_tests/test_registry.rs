// integration tests for the function whitelist

use std::sync::Arc;

use flowexpr::sandbox::register_global;
use flowexpr::{parse_value, FunctionGroup, Registry, Sandbox};
use serde_json::json;

use crate::common::*;

fn groups(value: serde_json::Value) -> Vec<FunctionGroup> {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_idempotent_registration() {
    let whitelist = groups(json!([
        { "group": "string", "functions": { "upper": {}, "lower": { "desc": "lowercase" } } },
        { "group": "math", "functions": ["abs"], "constants": { "RATE": 0.5 } }
    ]));

    let mut registry = Registry::new();
    assert_eq!(registry.register_groups(&whitelist).unwrap(), 4);
    assert_eq!(registry.register_groups(&whitelist).unwrap(), 0);

    let codes: Vec<&str> = registry.functions().map(|f| f.code.as_str()).collect();
    assert_eq!(codes, vec!["abs", "lower", "upper"]);
    assert_eq!(registry.constants().count(), 1);
}

#[test]
fn test_custom_registry_limits_sandbox() {
    let mut registry = Registry::new();
    registry
        .register_groups(&groups(json!([
            { "group": "alias", "functions": { "shout": { "function": "upper" } } }
        ])))
        .unwrap();
    let sandbox = Sandbox::new(Arc::new(registry));

    let shout = parse_value(&expression(vec![method("shout", vec![constant("hey")])]))
        .unwrap()
        .unwrap();
    assert_eq!(shout.get_result(&sandbox, &data(json!({}))).unwrap(), json!("HEY"));

    // the builtin itself is not whitelisted under its own name here
    let upper = parse_value(&expression(vec![method("upper", vec![constant("hey")])]))
        .unwrap()
        .unwrap();
    assert!(upper.get_result(&sandbox, &data(json!({}))).is_err());
}

#[test]
fn test_global_registration_is_idempotent() {
    let whitelist = groups(json!([
        { "group": "alias", "functions": { "integration_shout": { "function": "upper" } } }
    ]));

    register_global(&whitelist).unwrap();
    assert_eq!(register_global(&whitelist).unwrap(), 0);

    let sandbox = Sandbox::global();
    assert!(sandbox.registry().function("integration_shout").is_some());
}

#[test]
fn test_concurrent_evaluation_shares_registry() {
    let value = parse_value(&expression(vec![method("upper", vec![expression(vec![field("s")])])]))
        .unwrap()
        .unwrap();
    let sandbox = Arc::new(Sandbox::global());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let (value, sandbox) = (value.clone(), Arc::clone(&sandbox));
            std::thread::spawn(move || {
                value
                    .get_result(&sandbox, &data(json!({ "s": format!("v{i}") })))
                    .unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), json!(format!("V{i}")));
    }
    assert_eq!(sandbox.live_sessions(), 0);
}
