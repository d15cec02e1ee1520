//! post-execution cast/validation of a raw result against a `DataType`

use serde_json::Value as JsonValue;

use super::DataType;
use crate::error::CoercionError;
use crate::scalar;

/// cast `value` to `data_type`, or explain why it does not fit
///
/// - `String`/`Number` accept numeric or string input only; a `Number`
///   target rejects strings that do not read as numbers
/// - `Array`/`Object` need array-shaped input (JSON array or object) and
///   return it unchanged
/// - `Boolean` always succeeds; `"true"`/`"false"` are read as booleans
/// - `Null` always yields null, `Expression` keeps the raw value
pub fn coerce(value: JsonValue, data_type: DataType) -> Result<JsonValue, CoercionError> {
    let mismatch = |value: &JsonValue| CoercionError {
        expected: data_type,
        actual: scalar::type_name(value),
    };

    match data_type {
        DataType::String => match &value {
            JsonValue::String(_) => Ok(value),
            JsonValue::Number(_) => Ok(JsonValue::String(scalar::stringify(&value))),
            _ => Err(mismatch(&value)),
        },
        DataType::Number => match &value {
            JsonValue::Number(_) => Ok(value),
            JsonValue::String(s) => scalar::parse_number(s.trim()).ok_or_else(|| mismatch(&value)),
            _ => Err(mismatch(&value)),
        },
        DataType::Array | DataType::Object => match &value {
            JsonValue::Array(_) | JsonValue::Object(_) => Ok(value),
            _ => Err(mismatch(&value)),
        },
        DataType::Boolean => Ok(JsonValue::Bool(match &value {
            JsonValue::String(s) if s.eq_ignore_ascii_case("true") => true,
            JsonValue::String(s) if s.eq_ignore_ascii_case("false") => false,
            other => scalar::truthy(other),
        })),
        DataType::Null => Ok(JsonValue::Null),
        DataType::Expression => Ok(value),
    }
}
