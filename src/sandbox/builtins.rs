//! host builtins a whitelist may expose
//!
//! every builtin takes already-evaluated arguments and returns a JSON value;
//! arity is checked by the interpreter before the call.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use super::compare;
use crate::scalar::{self, as_number, stringify, truthy};

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct BuiltinError(pub String);

pub type BuiltinFn = fn(&[JsonValue]) -> Result<JsonValue, BuiltinError>;

/// a native callable with its declared signature
#[derive(Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub group: &'static str,
    pub return_type: &'static str,
    pub description: &'static str,
    pub min_args: usize,
    /// `None` for variadic builtins
    pub max_args: Option<usize>,
    pub call: BuiltinFn,
}

impl Builtin {
    pub fn accepts(&self, argc: usize) -> bool {
        argc >= self.min_args && self.max_args.map_or(true, |max| argc <= max)
    }

    /// human readable arity (`2`, `1-3`, `1+`)
    pub fn arity(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{}-{}", self.min_args, max),
            None => format!("{}+", self.min_args),
        }
    }
}

macro_rules! builtin {
    ($name:literal, $group:literal, $ret:literal, $desc:literal, $min:expr, $max:expr, $call:expr) => {
        Builtin {
            name: $name,
            group: $group,
            return_type: $ret,
            description: $desc,
            min_args: $min,
            max_args: $max,
            call: $call,
        }
    };
}

pub static BUILTINS: &[Builtin] = &[
    // string
    builtin!("strlen", "string", "number", "length of a string in characters", 1, Some(1), strlen),
    builtin!("upper", "string", "string", "uppercase a string", 1, Some(1), upper),
    builtin!("lower", "string", "string", "lowercase a string", 1, Some(1), lower),
    builtin!("trim", "string", "string", "strip surrounding whitespace", 1, Some(1), trim),
    builtin!("substr", "string", "string", "substring by start and optional length", 2, Some(3), substr),
    builtin!("replace", "string", "string", "replace every occurrence of a substring", 3, Some(3), replace),
    builtin!("split", "string", "array", "split a string by a separator", 2, Some(2), split),
    builtin!("concat", "string", "string", "append all arguments", 1, None, concat),
    builtin!("contains", "string", "boolean", "substring or element membership", 2, Some(2), contains),
    builtin!("starts_with", "string", "boolean", "string prefix test", 2, Some(2), starts_with),
    builtin!("ends_with", "string", "boolean", "string suffix test", 2, Some(2), ends_with),
    // array
    builtin!("join", "array", "string", "join array elements with a separator", 1, Some(2), join),
    builtin!("count", "array", "number", "number of elements", 1, Some(1), count),
    builtin!("in_array", "array", "boolean", "loose membership of a value in an array", 2, Some(2), in_array),
    // math
    builtin!("abs", "math", "number", "absolute value", 1, Some(1), abs),
    builtin!("round", "math", "number", "round to an optional precision", 1, Some(2), round),
    builtin!("floor", "math", "number", "round down", 1, Some(1), floor),
    builtin!("ceil", "math", "number", "round up", 1, Some(1), ceil),
    builtin!("max", "math", "number", "largest argument or array element", 1, None, max),
    builtin!("min", "math", "number", "smallest argument or array element", 1, None, min),
    builtin!("sum", "math", "number", "sum of arguments or array elements", 1, None, sum),
    builtin!("avg", "math", "number", "mean of arguments or array elements", 1, None, avg),
    // cast
    builtin!("to_int", "cast", "number", "integer part, 0 when not numeric", 1, Some(1), to_int),
    builtin!("to_float", "cast", "number", "float value, 0 when not numeric", 1, Some(1), to_float),
    builtin!("to_string", "cast", "string", "string form of a value", 1, Some(1), to_string),
    builtin!("is_numeric", "cast", "boolean", "number or numeric string", 1, Some(1), is_numeric),
    // json
    builtin!("json_encode", "json", "string", "encode a value as JSON", 1, Some(1), json_encode),
    builtin!("json_decode", "json", "expression", "decode a JSON string", 1, Some(1), json_decode),
    // hash
    builtin!("md5", "hash", "string", "hex md5 digest", 1, Some(1), md5_hex),
    // date
    builtin!("now", "date", "number", "current unix timestamp", 0, Some(0), now),
    builtin!("date_format", "date", "string", "format a timestamp", 1, Some(2), date_format),
    // logic
    builtin!("if_else", "logic", "expression", "pick a value by truthiness", 3, Some(3), if_else),
    builtin!("default", "logic", "expression", "fallback for unset or blank values", 2, Some(2), default),
];

/// constants registered by the default whitelist
pub fn default_constants() -> Map<String, JsonValue> {
    let mut constants = Map::new();
    constants.insert("PI".to_string(), scalar::number(std::f64::consts::PI));
    constants.insert("E".to_string(), scalar::number(std::f64::consts::E));
    constants.insert("EOL".to_string(), JsonValue::String("\n".to_string()));
    constants
}

pub fn find(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|b| b.name)
}

// ============================================================================
// Argument helpers
// ============================================================================

fn text(args: &[JsonValue], i: usize) -> String {
    args.get(i).map(stringify).unwrap_or_default()
}

fn num(args: &[JsonValue], i: usize) -> Result<f64, BuiltinError> {
    let value = args.get(i).unwrap_or(&JsonValue::Null);
    match value {
        JsonValue::Null => Ok(0.0),
        JsonValue::Bool(b) => Ok(f64::from(u8::from(*b))),
        other => as_number(other).ok_or_else(|| {
            BuiltinError(format!(
                "argument {} must be numeric, got {}",
                i + 1,
                scalar::type_name(other)
            ))
        }),
    }
}

/// a single array argument spreads into its elements
fn spread(args: &[JsonValue]) -> &[JsonValue] {
    match args {
        [JsonValue::Array(items)] => items,
        _ => args,
    }
}

// ============================================================================
// String
// ============================================================================

fn strlen(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    Ok(JsonValue::from(text(args, 0).chars().count()))
}

fn upper(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    Ok(JsonValue::String(text(args, 0).to_uppercase()))
}

fn lower(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    Ok(JsonValue::String(text(args, 0).to_lowercase()))
}

fn trim(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    Ok(JsonValue::String(text(args, 0).trim().to_string()))
}

/// negative start counts from the end; negative length stops short of it
fn substr(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    let chars: Vec<char> = text(args, 0).chars().collect();
    let len = chars.len() as i64;

    let start = num(args, 1)? as i64;
    let start = if start < 0 { len.saturating_add(start).max(0) } else { start.min(len) };

    let end = match args.get(2) {
        None | Some(JsonValue::Null) => len,
        Some(_) => {
            let count = num(args, 2)? as i64;
            if count < 0 {
                len.saturating_add(count).max(start)
            } else {
                start.saturating_add(count).min(len)
            }
        }
    };

    Ok(JsonValue::String(
        chars[start as usize..end.max(start) as usize].iter().collect(),
    ))
}

fn replace(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    let search = text(args, 1);
    if search.is_empty() {
        return Ok(JsonValue::String(text(args, 0)));
    }
    Ok(JsonValue::String(text(args, 0).replace(&search, &text(args, 2))))
}

fn split(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    let subject = text(args, 0);
    let sep = text(args, 1);
    let parts: Vec<JsonValue> = if sep.is_empty() {
        subject.chars().map(|c| JsonValue::String(c.to_string())).collect()
    } else {
        subject
            .split(sep.as_str())
            .map(|s| JsonValue::String(s.to_string()))
            .collect()
    };
    Ok(JsonValue::Array(parts))
}

fn concat(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    Ok(JsonValue::String(args.iter().map(stringify).collect()))
}

fn contains(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    Ok(JsonValue::Bool(compare::contains(&args[0], &args[1])))
}

fn starts_with(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    Ok(JsonValue::Bool(text(args, 0).starts_with(&text(args, 1))))
}

fn ends_with(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    Ok(JsonValue::Bool(text(args, 0).ends_with(&text(args, 1))))
}

// ============================================================================
// Array
// ============================================================================

fn join(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    let sep = args.get(1).map(stringify).unwrap_or_else(|| ",".to_string());
    match &args[0] {
        JsonValue::Array(items) => Ok(JsonValue::String(
            items.iter().map(stringify).collect::<Vec<_>>().join(sep.as_str()),
        )),
        other => Err(BuiltinError(format!(
            "join expects an array, got {}",
            scalar::type_name(other)
        ))),
    }
}

fn count(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    let n = match &args[0] {
        JsonValue::Null => 0,
        JsonValue::Array(items) => items.len(),
        JsonValue::Object(map) => map.len(),
        _ => 1,
    };
    Ok(JsonValue::from(n))
}

fn in_array(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    match &args[1] {
        JsonValue::Array(items) => Ok(JsonValue::Bool(
            items.iter().any(|item| compare::loose_eq(item, &args[0])),
        )),
        other => Err(BuiltinError(format!(
            "in_array expects an array, got {}",
            scalar::type_name(other)
        ))),
    }
}

// ============================================================================
// Math
// ============================================================================

fn abs(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    Ok(scalar::number(num(args, 0)?.abs()))
}

fn round(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    let value = num(args, 0)?;
    let precision = match args.get(1) {
        Some(_) => num(args, 1)? as i32,
        None => 0,
    };
    let factor = 10f64.powi(precision);
    Ok(scalar::number((value * factor).round() / factor))
}

fn floor(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    Ok(scalar::number(num(args, 0)?.floor()))
}

fn ceil(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    Ok(scalar::number(num(args, 0)?.ceil()))
}

fn extreme(args: &[JsonValue], want: std::cmp::Ordering) -> Result<JsonValue, BuiltinError> {
    let items = spread(args);
    let mut best = items
        .first()
        .ok_or_else(|| BuiltinError("expected at least one value".to_string()))?;
    for item in &items[1..] {
        if compare::compare(item, best) == Some(want) {
            best = item;
        }
    }
    Ok(best.clone())
}

fn max(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    extreme(args, std::cmp::Ordering::Greater)
}

fn min(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    extreme(args, std::cmp::Ordering::Less)
}

fn numbers(args: &[JsonValue]) -> Result<Vec<f64>, BuiltinError> {
    let items = spread(args);
    (0..items.len()).map(|i| num(items, i)).collect()
}

fn sum(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    Ok(scalar::number(numbers(args)?.iter().sum()))
}

fn avg(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    let values = numbers(args)?;
    if values.is_empty() {
        return Ok(JsonValue::Null);
    }
    Ok(scalar::number(values.iter().sum::<f64>() / values.len() as f64))
}

// ============================================================================
// Cast, JSON and hashing
// ============================================================================

fn to_int(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    let value = num(args, 0).unwrap_or(0.0);
    Ok(JsonValue::from(value.trunc() as i64))
}

fn to_float(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    let value = num(args, 0).unwrap_or(0.0);
    Ok(serde_json::Number::from_f64(value)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null))
}

fn to_string(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    Ok(JsonValue::String(text(args, 0)))
}

fn is_numeric(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    Ok(JsonValue::Bool(as_number(&args[0]).is_some()))
}

fn json_encode(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    serde_json::to_string(&args[0])
        .map(JsonValue::String)
        .map_err(|e| BuiltinError(format!("cannot encode value: {}", e)))
}

fn json_decode(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    match &args[0] {
        JsonValue::String(s) => serde_json::from_str(s)
            .map_err(|e| BuiltinError(format!("invalid JSON: {}", e))),
        other => Ok(other.clone()),
    }
}

fn md5_hex(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    Ok(JsonValue::String(format!(
        "{:x}",
        md5::compute(text(args, 0).as_bytes())
    )))
}

// ============================================================================
// Date
// ============================================================================

fn now(_args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    Ok(JsonValue::from(Utc::now().timestamp()))
}

fn date_format(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    let format = args
        .get(1)
        .map(stringify)
        .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());

    let dt = match &args[0] {
        JsonValue::String(s) if as_number(&args[0]).is_none() => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| BuiltinError(format!("invalid date '{}': {}", s, e)))?,
        other => {
            let secs = num(std::slice::from_ref(other), 0)? as i64;
            DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| BuiltinError(format!("timestamp out of range: {}", secs)))?
        }
    };

    Ok(JsonValue::String(dt.format(&format).to_string()))
}

// ============================================================================
// Logic
// ============================================================================

fn if_else(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    Ok(if truthy(&args[0]) {
        args[1].clone()
    } else {
        args[2].clone()
    })
}

fn default(args: &[JsonValue]) -> Result<JsonValue, BuiltinError> {
    let value = &args[0];
    let blank = scalar::is_unset(Some(value)) || value.as_str() == Some("");
    Ok(if blank { args[1].clone() } else { value.clone() })
}
