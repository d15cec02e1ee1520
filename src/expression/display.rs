//! resolution of display tokens (member pickers, dates, selections)
//!
//! these tokens never run through the sandbox; their result is read from
//! the payload the designer stored on the token.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use super::{parse_value_at, ExpressionItem, ExpressionType};
use crate::error::{CompileError, Result};
use crate::sandbox::Sandbox;
use crate::scalar::{self, Bindings};

pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// epoch values above this are taken as milliseconds
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// resolve a display token, evaluating field references in member lists
pub(super) fn resolve(item: &ExpressionItem, sandbox: &Sandbox, data: &Bindings) -> Result<JsonValue> {
    let payload = item.display_value.as_ref().unwrap_or(&JsonValue::Null);
    match item.kind {
        ExpressionType::Member | ExpressionType::Names => members(payload, |entry| {
            match parse_value_at(entry.get("value").unwrap_or(&JsonValue::Null), "value")? {
                Some(value) => value.get_result(sandbox, data),
                None => Ok(JsonValue::Null),
            }
        }),
        _ => Ok(static_payload(item.kind, payload)),
    }
}

/// resolve a display token at lowering time, without bindings
pub(crate) fn static_literal(item: &ExpressionItem) -> Result<JsonValue, CompileError> {
    let payload = item.display_value.as_ref().unwrap_or(&JsonValue::Null);
    match item.kind {
        ExpressionType::Member | ExpressionType::Names => members(payload, |_| {
            Err(CompileError::UnsupportedItem {
                kind: item.kind.as_str(),
                reason: "field references inside a template need bindings".to_string(),
            })
        }),
        _ => Ok(static_payload(item.kind, payload)),
    }
}

fn static_payload(kind: ExpressionType, payload: &JsonValue) -> JsonValue {
    match kind {
        ExpressionType::Datetime => format_datetime(payload, DEFAULT_DATETIME_FORMAT),
        ExpressionType::Checkbox => JsonValue::Bool(checkbox(payload)),
        ExpressionType::Select => option_value(payload),
        ExpressionType::Multiple => JsonValue::Array(
            as_list(payload).iter().map(option_value).collect(),
        ),
        ExpressionType::DepartmentNames => JsonValue::Array(
            as_list(payload)
                .iter()
                .map(|entry| match entry.get("name") {
                    Some(name) => JsonValue::String(scalar::stringify(name)),
                    None => entry.clone(),
                })
                .collect(),
        ),
        ExpressionType::Member
        | ExpressionType::Names
        | ExpressionType::Field
        | ExpressionType::Input
        | ExpressionType::Method => payload.clone(),
    }
}

/// collect member ids; entries tagged `field` are resolved by `field`
/// and arrays they produce are flattened
fn members<E>(
    payload: &JsonValue,
    mut field: impl FnMut(&JsonValue) -> Result<JsonValue, E>,
) -> Result<JsonValue, E> {
    let mut out = Vec::new();
    for entry in as_list(payload) {
        let is_field = entry.get("type").and_then(JsonValue::as_str) == Some("field");
        if is_field {
            match field(&entry)? {
                JsonValue::Null => {}
                JsonValue::Array(items) => out.extend(items),
                other => out.push(other),
            }
            continue;
        }
        if let Some(id) = entry.get("value").or_else(|| entry.get("id")) {
            out.push(id.clone());
        } else if !entry.is_object() {
            out.push(entry.clone());
        }
    }
    Ok(JsonValue::Array(out))
}

fn as_list(payload: &JsonValue) -> Vec<JsonValue> {
    match payload {
        JsonValue::Null => Vec::new(),
        JsonValue::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn option_value(option: &JsonValue) -> JsonValue {
    match option.get("value") {
        Some(value) if option.is_object() => value.clone(),
        _ => option.clone(),
    }
}

fn checkbox(payload: &JsonValue) -> bool {
    match payload {
        JsonValue::String(s) if s.eq_ignore_ascii_case("false") => false,
        JsonValue::String(s) if s.eq_ignore_ascii_case("true") => true,
        other => scalar::truthy(other),
    }
}

fn format_datetime(payload: &JsonValue, format: &str) -> JsonValue {
    match payload {
        JsonValue::Object(obj) => {
            let format = obj
                .get("format")
                .and_then(JsonValue::as_str)
                .unwrap_or(format);
            format_datetime(obj.get("value").unwrap_or(&JsonValue::Null), format)
        }
        JsonValue::Number(n) => n
            .as_i64()
            .and_then(from_epoch)
            .map(|dt| JsonValue::String(dt.format(format).to_string()))
            .unwrap_or(JsonValue::Null),
        JsonValue::String(s) => {
            let parsed = match s.trim().parse::<i64>() {
                Ok(epoch) => from_epoch(epoch),
                Err(_) => DateTime::parse_from_rfc3339(s.trim())
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc)),
            };
            match parsed {
                Some(dt) => JsonValue::String(dt.format(format).to_string()),
                // already formatted by the designer
                None => payload.clone(),
            }
        }
        _ => JsonValue::Null,
    }
}

fn from_epoch(epoch: i64) -> Option<DateTime<Utc>> {
    if epoch.abs() >= MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(epoch)
    } else {
        DateTime::from_timestamp(epoch, 0)
    }
}
