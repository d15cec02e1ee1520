//! expression parser - converts designer JSON to `Value`/`Expression` trees
//!
//! value shape:
//! `{ "type": "const"|"expression", "const_value": [...], "expression_value": [...],
//!    "data_type"?: "...", "is_string_template"?: bool }`
//!
//! token shape:
//! `{ "type": "fields"|"input"|"methods"|..., "value": ..., "name"?: "...",
//!    "args"?: [Value], "trans"?: "...", "<type>_value"?: payload }`
//!
//! empty input yields `None`; malformed input is a `BuildError` carrying the
//! JSON path of the offending node.

use serde_json::{Map, Value as JsonValue};

use super::{DataType, Expression, ExpressionItem, ExpressionType, Value, ValueType};
use crate::error::BuildError;
use crate::scalar;

/// parse a value definition
pub fn parse_value(json: &JsonValue) -> Result<Option<Value>, BuildError> {
    parse_value_at(json, "")
}

/// parse a token list as an expression of the given value kind
pub fn parse_expression(
    items: &JsonValue,
    value_kind: ValueType,
) -> Result<Option<Expression>, BuildError> {
    parse_expression_at(items, value_kind, "")
}

pub(crate) fn parse_value_at(json: &JsonValue, path: &str) -> Result<Option<Value>, BuildError> {
    let obj = match json {
        JsonValue::Object(obj) if !obj.is_empty() => obj,
        _ => return Ok(None),
    };

    let value_type = match obj.get("type") {
        Some(JsonValue::String(tag)) => ValueType::parse(tag).ok_or_else(|| {
            BuildError::new(format!("unknown value type: '{}'", tag), join(path, "type"))
        })?,
        Some(other) => {
            return Err(BuildError::new(
                format!("value type must be a string, got {}", scalar::type_name(other)),
                join(path, "type"),
            ))
        }
        // untagged values are inferred from whichever token list is present
        None if obj.contains_key("const_value") => ValueType::Const,
        None if obj.contains_key("expression_value") => ValueType::Expression,
        None => return Ok(None),
    };

    let key = value_type.items_key();
    let items = obj.get(key).unwrap_or(&JsonValue::Null);
    let Some(mut expression) = parse_expression_at(items, value_type, &join(path, key))? else {
        return Ok(None);
    };

    if let Some(flag) = obj.get("is_string_template").and_then(JsonValue::as_bool) {
        expression.set_is_string_template(flag);
    }

    let mut value = match value_type {
        ValueType::Const => Value::constant(expression),
        ValueType::Expression => Value::expression(expression),
    };
    value.set_data_type(parse_data_type(obj, path)?);

    Ok(Some(value))
}

fn parse_data_type(obj: &Map<String, JsonValue>, path: &str) -> Result<Option<DataType>, BuildError> {
    match obj.get("data_type") {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(tag)) if tag.is_empty() => Ok(None),
        Some(JsonValue::String(tag)) => DataType::parse(tag).map(Some).ok_or_else(|| {
            BuildError::new(format!("unknown data type: '{}'", tag), join(path, "data_type"))
        }),
        Some(other) => Err(BuildError::new(
            format!("data type must be a string, got {}", scalar::type_name(other)),
            join(path, "data_type"),
        )),
    }
}

fn parse_expression_at(
    items: &JsonValue,
    value_kind: ValueType,
    path: &str,
) -> Result<Option<Expression>, BuildError> {
    let arr = match items {
        JsonValue::Array(arr) => arr,
        JsonValue::Null => return Ok(None),
        other => {
            return Err(BuildError::new(
                format!("expected an array of tokens, got {}", scalar::type_name(other)),
                path,
            ))
        }
    };

    let items = arr
        .iter()
        .enumerate()
        .map(|(i, item)| parse_item(item, value_kind, &format!("{}[{}]", path, i)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Expression::new(items))
}

fn parse_item(json: &JsonValue, value_kind: ValueType, path: &str) -> Result<ExpressionItem, BuildError> {
    let obj = json.as_object().ok_or_else(|| {
        BuildError::new(
            format!("expected token object, got {}", scalar::type_name(json)),
            path,
        )
    })?;

    let tag = obj
        .get("type")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| BuildError::new("token is missing 'type'", path))?;
    let kind = ExpressionType::parse(tag)
        .ok_or_else(|| BuildError::new(format!("unknown token type: '{}'", tag), join(path, "type")))?;

    let value = match obj.get("value") {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(v @ (JsonValue::Number(_) | JsonValue::Bool(_))) => scalar::stringify(v),
        Some(other) => {
            return Err(BuildError::new(
                format!("token value must be a scalar, got {}", scalar::type_name(other)),
                join(path, "value"),
            ))
        }
    };

    let mut item = match kind {
        ExpressionType::Field => ExpressionItem::field(value),
        ExpressionType::Input => ExpressionItem::input(value, value_kind),
        ExpressionType::Method => {
            let name = string_field(obj, "name").unwrap_or_else(|| value.clone());
            let mut item = ExpressionItem::method(name, parse_args(obj, path)?);
            item.value = value;
            item
        }
        display => ExpressionItem::display(
            display,
            obj.get(&display.payload_key()).cloned().unwrap_or(JsonValue::Null),
        ),
    };

    item.value_kind = value_kind;
    if kind != ExpressionType::Method {
        if let Some(name) = string_field(obj, "name") {
            item.name = name;
        }
    }
    if let Some(trans) = string_field(obj, "trans") {
        item = item.with_trans(trans);
    }
    if let Some(component_id) = string_field(obj, "component_id") {
        item = item.with_component(component_id);
    }

    Ok(item)
}

/// call arguments; arguments that build to nothing (`()`) are dropped
fn parse_args(obj: &Map<String, JsonValue>, path: &str) -> Result<Vec<Value>, BuildError> {
    let Some(args) = obj.get("args") else {
        return Ok(Vec::new());
    };
    let arr = args.as_array().ok_or_else(|| {
        BuildError::new("method args must be an array", join(path, "args"))
    })?;

    let mut out = Vec::with_capacity(arr.len());
    for (i, arg) in arr.iter().enumerate() {
        let arg_path = format!("{}[{}]", join(path, "args"), i);
        if let Some(value) = parse_value_at(arg, &arg_path)? {
            if !is_noop_call(&value) {
                out.push(value);
            }
        }
    }
    Ok(out)
}

/// a nameless, argument-free call renders as a bare `()`
fn is_noop_call(value: &Value) -> bool {
    value.expression_ref().single().is_some_and(|item| {
        item.kind == ExpressionType::Method && item.method_name().is_empty() && item.args.is_empty()
    })
}

fn string_field(obj: &Map<String, JsonValue>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(JsonValue::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}
