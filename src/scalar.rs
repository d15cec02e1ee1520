//! helpers for treating JSON values as loosely-typed scalars
//!
//! the sandbox, the trans pipeline and data type coercion all agree on what
//! "numeric", "truthy" and "as a string" mean; those rules live here.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Number, Value as JsonValue};

/// named bindings an expression is evaluated against (the `data` context)
pub type Bindings = Map<String, JsonValue>;

lazy_static! {
    static ref NUMERIC: Regex = Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$")
        .expect("numeric pattern is valid");
}

/// runtime type name of a value
pub fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// check if a literal looks like a number (no embedded whitespace)
pub fn is_numeric_str(s: &str) -> bool {
    NUMERIC.is_match(s)
}

/// parse a numeric-looking literal, keeping integers integral
pub fn parse_number(s: &str) -> Option<JsonValue> {
    if !is_numeric_str(s) {
        return None;
    }
    if let Ok(i) = s.trim_start_matches('+').parse::<i64>() {
        return Some(JsonValue::Number(i.into()));
    }
    s.parse::<f64>().ok().map(number)
}

/// build a JSON number, collapsing integral floats to integers
pub fn number(f: f64) -> JsonValue {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
        return JsonValue::Number((f as i64).into());
    }
    Number::from_f64(f)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

/// numeric view of numbers and numeric strings
pub fn as_number(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) if is_numeric_str(s.trim()) => s.trim().parse().ok(),
        _ => None,
    }
}

/// string form used for concatenation and string conversions
pub fn stringify(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => format_number(n),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(_) | JsonValue::Object(_) => {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

fn format_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => (f as i64).to_string(),
        _ => n.to_string(),
    }
}

/// truthiness used by `Operation` items and boolean casts
pub fn truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        JsonValue::String(s) => !s.is_empty() && s != "0",
        JsonValue::Array(a) => !a.is_empty(),
        JsonValue::Object(o) => !o.is_empty(),
    }
}

/// walk a path of keys (or array indexes) through the bindings
pub fn lookup<'a>(data: &'a Bindings, path: &[String]) -> Option<&'a JsonValue> {
    let (first, rest) = path.split_first()?;
    let mut current = data.get(first)?;
    for segment in rest {
        current = match current {
            JsonValue::Object(map) => map.get(segment)?,
            JsonValue::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// a missing value, an explicit null and an empty array all count as unset
pub fn is_unset(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => true,
        Some(JsonValue::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}
