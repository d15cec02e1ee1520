//! trans pipeline: dot-chained transforms applied to raw field values before
//! they are bound into the execution context
//!
//! ```text
//! chain = call ('.' call)*
//! call  = ident '(' arg? ')'
//! arg   = quoted string | bare text
//! ```
//!
//! the transformed value is bound under `path + "_" + md5(chain)`, which is
//! also the key the generator's field lookup addresses.

use std::borrow::Cow;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::trace;

use crate::expression::ExpressionItem;
use crate::scalar::{self, Bindings};
use crate::suggest;

lazy_static! {
    static ref CALL: Regex = Regex::new(r"(?s)^([A-Za-z_][A-Za-z0-9_]*)\s*\((.*)\)$")
        .expect("call pattern is valid");
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransError {
    #[error("trans error: invalid chain '{chain}': {reason}")]
    Syntax { chain: String, reason: String },

    #[error("trans error: unknown transform '{name}'{hint}")]
    Unknown { name: String, hint: String },

    #[error("trans error: {step} expects {expected}, got {actual}")]
    SourceType {
        step: String,
        expected: String,
        actual: &'static str,
    },

    #[error("trans error: {step} cannot convert '{value}' to a number")]
    NotNumeric { step: String, value: String },
}

/// a single named transform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    ToNumber,
    ToString,
    ToArray,
    ToBoolean,
    ToJson,
    Count,
    Empty,
    Join(String),
}

impl Transform {
    const NAMES: [&'static str; 8] = [
        "toNumber",
        "toString",
        "toArray",
        "toBoolean",
        "toJson",
        "count",
        "empty",
        "join",
    ];

    fn parse(name: &str, arg: Option<String>, chain: &str) -> Result<Self, TransError> {
        let step = match name {
            "toNumber" => Transform::ToNumber,
            "toString" => Transform::ToString,
            "toArray" => Transform::ToArray,
            "toBoolean" => Transform::ToBoolean,
            "toJson" => Transform::ToJson,
            "count" => Transform::Count,
            "empty" => Transform::Empty,
            "join" => return Ok(Transform::Join(arg.unwrap_or_else(|| ",".to_string()))),
            _ => {
                return Err(TransError::Unknown {
                    name: name.to_string(),
                    hint: suggest::hint(suggest::closest(name, Self::NAMES)),
                })
            }
        };

        match arg {
            Some(arg) => Err(TransError::Syntax {
                chain: chain.to_string(),
                reason: format!("{}() takes no argument, got '{}'", name, arg),
            }),
            None => Ok(step),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transform::ToNumber => "toNumber",
            Transform::ToString => "toString",
            Transform::ToArray => "toArray",
            Transform::ToBoolean => "toBoolean",
            Transform::ToJson => "toJson",
            Transform::Count => "count",
            Transform::Empty => "empty",
            Transform::Join(_) => "join",
        }
    }

    /// runtime types this step declares as its source, `None` for any
    fn source_types(&self) -> Option<&'static [&'static str]> {
        match self {
            Transform::ToNumber => Some(&["number", "string", "boolean"]),
            Transform::ToString | Transform::ToArray => None,
            Transform::ToBoolean => Some(&["boolean", "number"]),
            Transform::ToJson | Transform::Empty => Some(&["array", "object"]),
            Transform::Count | Transform::Join(_) => Some(&["array"]),
        }
    }

    pub fn apply(&self, value: JsonValue) -> Result<JsonValue, TransError> {
        if let Some(accepted) = self.source_types() {
            let actual = scalar::type_name(&value);
            if !accepted.contains(&actual) {
                return Err(TransError::SourceType {
                    step: self.to_string(),
                    expected: accepted.join("|"),
                    actual,
                });
            }
        }

        Ok(match self {
            // numeric string, not a JSON number
            Transform::ToNumber => {
                let number = match &value {
                    JsonValue::Number(_) => value,
                    JsonValue::Bool(b) => JsonValue::from(u8::from(*b)),
                    other => {
                        let text = scalar::stringify(other);
                        scalar::parse_number(text.trim()).ok_or_else(|| TransError::NotNumeric {
                            step: self.to_string(),
                            value: text.clone(),
                        })?
                    }
                };
                JsonValue::String(scalar::stringify(&number))
            }
            Transform::ToString => JsonValue::String(scalar::stringify(&value)),
            Transform::ToArray => match value {
                JsonValue::Null => JsonValue::Array(Vec::new()),
                JsonValue::Array(_) => value,
                other => JsonValue::Array(vec![other]),
            },
            Transform::ToBoolean => JsonValue::Bool(scalar::truthy(&value)),
            Transform::ToJson => JsonValue::String(scalar::stringify(&value)),
            Transform::Count => JsonValue::from(value.as_array().map_or(0, Vec::len)),
            Transform::Empty => JsonValue::Bool(!scalar::truthy(&value)),
            Transform::Join(sep) => JsonValue::String(
                value
                    .as_array()
                    .map(|items| {
                        items
                            .iter()
                            .map(scalar::stringify)
                            .collect::<Vec<_>>()
                            .join(sep.as_str())
                    })
                    .unwrap_or_default(),
            ),
        })
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Join(sep) => write!(f, "join('{}')", sep),
            other => write!(f, "{}()", other.name()),
        }
    }
}

/// a parsed trans chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransChain {
    steps: Vec<Transform>,
}

impl TransChain {
    pub fn parse(chain: &str) -> Result<Self, TransError> {
        let syntax = |reason: String| TransError::Syntax {
            chain: chain.to_string(),
            reason,
        };

        let mut steps = Vec::new();
        for segment in split_calls(chain).map_err(|reason| syntax(reason.to_string()))? {
            let caps = CALL
                .captures(segment)
                .ok_or_else(|| syntax(format!("expected call, got '{}'", segment)))?;
            let arg = parse_arg(&caps[2]).map_err(|reason| syntax(reason.to_string()))?;
            steps.push(Transform::parse(&caps[1], arg, chain)?);
        }

        if steps.is_empty() {
            return Err(syntax("empty chain".to_string()));
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[Transform] {
        &self.steps
    }

    /// run every step left to right; no step is ever skipped
    pub fn apply(&self, value: JsonValue) -> Result<JsonValue, TransError> {
        self.steps.iter().try_fold(value, |acc, step| step.apply(acc))
    }
}

/// split on `.` outside quotes and parentheses
fn split_calls(chain: &str) -> Result<Vec<&str>, &'static str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in chain.char_indices() {
        if let Some(q) = quote {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                _ if c == q => quote = None,
                _ => {}
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1).ok_or("unbalanced ')'")?,
            '.' if depth == 0 => {
                out.push(chain[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    if quote.is_some() {
        return Err("unterminated string");
    }
    if depth != 0 {
        return Err("unbalanced '('");
    }
    let last = chain[start..].trim();
    if !last.is_empty() || !out.is_empty() {
        out.push(last);
    }
    if out.iter().any(|s| s.is_empty()) {
        return Err("empty call");
    }
    Ok(out)
}

fn parse_arg(raw: &str) -> Result<Option<String>, &'static str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let mut chars = raw.chars();
    let Some(q @ ('\'' | '"')) = chars.next() else {
        return Ok(Some(raw.to_string()));
    };
    if raw.len() < 2 || !raw.ends_with(q) {
        return Err("argument has trailing text after the string");
    }

    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for c in inner.chars() {
        match c {
            _ if escaped => {
                out.push(c);
                escaped = false;
            }
            '\\' => escaped = true,
            _ => out.push(c),
        }
    }
    Ok(Some(out))
}

/// synthetic binding key for a transformed field
pub fn binding_key(path: &str, chain: &str) -> String {
    format!("{}_{:x}", path, md5::compute(chain.as_bytes()))
}

/// apply each item's chain to its raw field value and bind the results
///
/// the source bindings are only cloned when at least one item carries a
/// chain.
pub fn bind<'a>(
    items: Vec<&ExpressionItem>,
    data: &'a Bindings,
) -> Result<Cow<'a, Bindings>, TransError> {
    if items.is_empty() {
        return Ok(Cow::Borrowed(data));
    }

    let mut bound = data.clone();
    for item in items {
        let (Some(chain), Some(key)) = (item.trans.as_deref(), item.trans_key()) else {
            continue;
        };
        let raw = scalar::lookup(data, &item.path())
            .cloned()
            .unwrap_or(JsonValue::Null);
        let value = TransChain::parse(chain)?.apply(raw)?;
        trace!(key = %key, chain = %chain, "bound transformed field");
        bound.insert(key, value);
    }
    Ok(Cow::Owned(bound))
}
