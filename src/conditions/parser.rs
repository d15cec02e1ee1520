//! condition parser - converts builder JSON to the condition AST
//!
//! ```json
//! {
//!   "ops": "AND",
//!   "children": [
//!     { "type": "compare", "left_operands": {...}, "condition": "gt", "right_operands": {...} },
//!     { "type": "operation", "operands": {...} },
//!     { "ops": "OR", "children": [...] }
//!   ]
//! }
//! ```
//!
//! groups without any effective child are dropped. the whole tree is
//! checked against the sandbox once, at the root.

use serde_json::{Map, Value as JsonValue};

use super::types::{CompareType, Condition, ConditionItem, ConditionNode, Ops};
use crate::error::{BuildError, Result};
use crate::expression::{parse_value_at, Value};
use crate::sandbox::Sandbox;

/// parse and validate a condition tree
///
/// # Returns
/// * `Ok(Some(Condition))` - the parsed, sandbox-checked condition
/// * `Ok(None)` - the input is not an object or has no effective children
/// * `Err(Error)` - malformed input, or a tree the sandbox rejects
pub fn parse_condition(json: &JsonValue, sandbox: &Sandbox) -> Result<Option<Condition>> {
    let Some(cond) = parse_group(json, "")? else {
        return Ok(None);
    };
    cond.validate(sandbox)?;
    Ok(Some(cond))
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn parse_group(json: &JsonValue, path: &str) -> Result<Option<Condition>, BuildError> {
    let JsonValue::Object(obj) = json else {
        return Ok(None);
    };

    let ops = match obj.get("ops") {
        None | Some(JsonValue::Null) => Ops::And,
        Some(JsonValue::String(s)) => Ops::parse(s).ok_or_else(|| {
            BuildError::new(
                format!("unknown logical operator '{}', expected AND or OR", s),
                join(path, "ops"),
            )
        })?,
        Some(_) => return Err(BuildError::new("ops must be a string", join(path, "ops"))),
    };

    let children = match obj.get("children") {
        None | Some(JsonValue::Null) => return Ok(None),
        Some(JsonValue::Array(children)) => children,
        Some(_) => {
            return Err(BuildError::new(
                "children must be an array",
                join(path, "children"),
            ))
        }
    };

    let mut nodes = Vec::with_capacity(children.len());
    for (i, child) in children.iter().enumerate() {
        let child_path = format!("{}[{}]", join(path, "children"), i);
        if let Some(node) = parse_child(child, &child_path)? {
            nodes.push(node);
        }
    }

    if nodes.is_empty() {
        return Ok(None);
    }
    Ok(Some(Condition::from_parts(ops, nodes)))
}

fn parse_child(json: &JsonValue, path: &str) -> Result<Option<ConditionNode>, BuildError> {
    let obj = match json {
        JsonValue::Null => return Ok(None),
        JsonValue::Object(obj) => obj,
        _ => return Err(BuildError::new("condition child must be an object", path)),
    };

    if obj.contains_key("children") || obj.contains_key("ops") {
        return Ok(parse_group(json, path)?.map(ConditionNode::Group));
    }

    // the type tag is optional when the shape is unambiguous
    let kind = match obj.get("type").and_then(JsonValue::as_str) {
        Some(kind) => kind,
        None if obj.contains_key("condition") => "compare",
        None if obj.contains_key("operands") => "operation",
        None => {
            return Err(BuildError::new(
                "missing item type, expected compare or operation",
                join(path, "type"),
            ))
        }
    };

    let item = match kind {
        "compare" => parse_compare(obj, path)?,
        "operation" => ConditionItem::operation(required_value(obj, "operands", path)?),
        other => {
            return Err(BuildError::new(
                format!("unknown item type '{}', expected compare or operation", other),
                join(path, "type"),
            ))
        }
    };
    Ok(Some(ConditionNode::Item(item)))
}

fn parse_compare(obj: &Map<String, JsonValue>, path: &str) -> Result<ConditionItem, BuildError> {
    let left = required_value(obj, "left_operands", path)?;

    let compare_type = match obj.get("condition") {
        Some(JsonValue::String(s)) => CompareType::parse(s).ok_or_else(|| {
            BuildError::new(
                format!("unknown comparison '{}'", s),
                join(path, "condition"),
            )
        })?,
        _ => {
            return Err(BuildError::new(
                "missing comparison operator",
                join(path, "condition"),
            ))
        }
    };

    let right = if compare_type.requires_right() {
        Some(required_value(obj, "right_operands", path)?)
    } else {
        None
    };

    ConditionItem::compare(compare_type, left, right)
        .map_err(|e| BuildError::new(e.message, join(path, &e.path)))
}

fn required_value(obj: &Map<String, JsonValue>, key: &str, path: &str) -> Result<Value, BuildError> {
    let value_path = join(path, key);
    let json = obj.get(key).unwrap_or(&JsonValue::Null);
    parse_value_at(json, &value_path)?
        .ok_or_else(|| BuildError::new(format!("{} is required", key), value_path))
}
