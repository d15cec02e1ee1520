//! loose and strict comparison rules used by the interpreter and builtins
//!
//! - loose equality compares numerically when both sides are numeric
//!   (numbers or numeric strings), as booleans when either side is a
//!   boolean, and treats null as equal to every falsy value
//! - strict equality requires the same runtime type
//! - ordering is numeric when both sides are numeric, otherwise it falls
//!   back to comparing string forms

use std::cmp::Ordering;

use serde_json::Value as JsonValue;

use crate::scalar::{self, as_number, stringify, truthy};

pub fn loose_eq(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Null, JsonValue::Null) => true,
        (JsonValue::Null, JsonValue::String(s)) | (JsonValue::String(s), JsonValue::Null) => {
            s.is_empty()
        }
        (JsonValue::Null, other) | (other, JsonValue::Null) => !truthy(other),
        (JsonValue::Bool(x), other) | (other, JsonValue::Bool(x)) => *x == truthy(other),
        (JsonValue::Array(x), JsonValue::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| loose_eq(a, b))
        }
        (JsonValue::Object(x), JsonValue::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| loose_eq(v, other)))
        }
        (JsonValue::Array(_) | JsonValue::Object(_), _)
        | (_, JsonValue::Array(_) | JsonValue::Object(_)) => false,
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => stringify(a) == stringify(b),
        },
    }
}

pub fn strict_eq(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => x.as_f64() == y.as_f64(),
        (JsonValue::Array(x), JsonValue::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| strict_eq(a, b))
        }
        (JsonValue::Object(x), JsonValue::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| strict_eq(v, other)))
        }
        _ => a == b,
    }
}

/// ordering for relational operators; `None` when the values are not
/// comparable (which makes every relation false)
pub fn compare(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    match (a, b) {
        (JsonValue::Bool(_), _) | (_, JsonValue::Bool(_)) => Some(truthy(a).cmp(&truthy(b))),
        (JsonValue::Null, JsonValue::String(s)) => Some("".cmp(s.as_str())),
        (JsonValue::String(s), JsonValue::Null) => Some(s.as_str().cmp("")),
        (JsonValue::Null, _) | (_, JsonValue::Null) => Some(truthy(a).cmp(&truthy(b))),
        (JsonValue::Array(x), JsonValue::Array(y)) => Some(x.len().cmp(&y.len())),
        (JsonValue::Array(_) | JsonValue::Object(_), _)
        | (_, JsonValue::Array(_) | JsonValue::Object(_)) => None,
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => Some(stringify(a).cmp(&stringify(b))),
        },
    }
}

/// substring test for strings, loose membership for arrays and object
/// values; null contains nothing
pub fn contains(haystack: &JsonValue, needle: &JsonValue) -> bool {
    match haystack {
        JsonValue::Null => false,
        JsonValue::Array(items) => items.iter().any(|item| loose_eq(item, needle)),
        JsonValue::Object(map) => map.values().any(|item| loose_eq(item, needle)),
        other => scalar::stringify(other).contains(&stringify(needle)),
    }
}
