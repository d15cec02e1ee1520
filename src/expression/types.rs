//! closed classification enums driving the builders, the generator and
//! result coercion

use std::fmt;

/// target type a value's result is coerced to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Number,
    Array,
    Object,
    Boolean,
    Null,
    /// no coercion, the raw result is kept
    Expression,
}

impl DataType {
    /// parse a data type tag; `integer` normalizes to `Number`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" => Some(DataType::String),
            "number" | "integer" | "int" | "float" => Some(DataType::Number),
            "array" => Some(DataType::Array),
            "object" => Some(DataType::Object),
            "boolean" | "bool" => Some(DataType::Boolean),
            "null" => Some(DataType::Null),
            "expression" => Some(DataType::Expression),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Number => "number",
            DataType::Array => "array",
            DataType::Object => "object",
            DataType::Boolean => "boolean",
            DataType::Null => "null",
            DataType::Expression => "expression",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// discriminant of a `Value`: a constant or a computed expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Const,
    Expression,
}

impl ValueType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "const" => Some(ValueType::Const),
            "expression" => Some(ValueType::Expression),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Const => "const",
            ValueType::Expression => "expression",
        }
    }

    /// JSON key holding the token list for this variant
    pub fn items_key(&self) -> &'static str {
        match self {
            ValueType::Const => "const_value",
            ValueType::Expression => "expression_value",
        }
    }
}

/// kind of a single expression token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionType {
    /// lookup into the data bindings
    Field,
    /// literal typed by the user
    Input,
    /// whitelisted function call
    Method,
    Member,
    Datetime,
    Multiple,
    Select,
    Checkbox,
    DepartmentNames,
    Names,
}

impl ExpressionType {
    const ALL: [ExpressionType; 10] = [
        ExpressionType::Field,
        ExpressionType::Input,
        ExpressionType::Method,
        ExpressionType::Member,
        ExpressionType::Datetime,
        ExpressionType::Multiple,
        ExpressionType::Select,
        ExpressionType::Checkbox,
        ExpressionType::DepartmentNames,
        ExpressionType::Names,
    ];

    /// resolve a type tag by exact match, then by the prefix before the
    /// first `_` (legacy tags such as `fields_abc123`)
    pub fn parse(tag: &str) -> Option<Self> {
        Self::exact(tag).or_else(|| {
            let (prefix, _) = tag.split_once('_')?;
            Self::exact(prefix)
        })
    }

    fn exact(tag: &str) -> Option<Self> {
        match tag {
            "field" => Some(ExpressionType::Field),
            "method" => Some(ExpressionType::Method),
            _ => Self::ALL.into_iter().find(|t| t.as_str() == tag),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpressionType::Field => "fields",
            ExpressionType::Input => "input",
            ExpressionType::Method => "methods",
            ExpressionType::Member => "member",
            ExpressionType::Datetime => "datetime",
            ExpressionType::Multiple => "multiple",
            ExpressionType::Select => "select",
            ExpressionType::Checkbox => "checkbox",
            ExpressionType::DepartmentNames => "department_names",
            ExpressionType::Names => "names",
        }
    }

    /// display kinds carry a structured payload and never concatenate
    pub fn is_display(&self) -> bool {
        !matches!(
            self,
            ExpressionType::Field | ExpressionType::Input | ExpressionType::Method
        )
    }

    /// JSON key of the display payload (`member_value`, ...)
    pub fn payload_key(&self) -> String {
        format!("{}_value", self.as_str())
    }
}

impl fmt::Display for ExpressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
