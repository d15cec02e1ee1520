//! the unit every collaborator holds when it needs a dynamic value

use serde_json::Value as JsonValue;
use tracing::warn;

use super::coerce::coerce;
use super::{DataType, Expression, ExpressionItem, ExpressionType, ValueType};
use crate::compiler;
use crate::error::{CompileError, Result};
use crate::sandbox::Sandbox;
use crate::scalar::{self, Bindings};

/// a constant or computed expression plus an optional result type
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    variant: ValueVariant,
    data_type: Option<DataType>,
}

#[derive(Debug, Clone, PartialEq)]
enum ValueVariant {
    Const(Expression),
    Expression(Expression),
}

impl Value {
    pub fn constant(expression: Expression) -> Self {
        Self {
            variant: ValueVariant::Const(expression),
            data_type: None,
        }
    }

    pub fn expression(expression: Expression) -> Self {
        Self {
            variant: ValueVariant::Expression(expression),
            data_type: None,
        }
    }

    /// legacy constant holding one literal
    ///
    /// returns `None` for a blank literal, which would prune to nothing.
    pub fn literal(text: impl Into<String>) -> Option<Self> {
        Expression::new(vec![ExpressionItem::input(text, ValueType::Const)]).map(Self::constant)
    }

    /// single field lookup
    pub fn field(path: impl Into<String>) -> Option<Self> {
        Expression::new(vec![ExpressionItem::field(path)]).map(Self::expression)
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn set_data_type(&mut self, data_type: Option<DataType>) {
        self.data_type = data_type;
    }

    pub fn data_type(&self) -> Option<DataType> {
        self.data_type
    }

    pub fn value_type(&self) -> ValueType {
        match self.variant {
            ValueVariant::Const(_) => ValueType::Const,
            ValueVariant::Expression(_) => ValueType::Expression,
        }
    }

    /// the populated expression, whichever variant holds it
    pub fn expression_ref(&self) -> &Expression {
        match &self.variant {
            ValueVariant::Const(e) | ValueVariant::Expression(e) => e,
        }
    }

    /// a `Const` made of exactly one `Input` token
    pub fn is_legacy_constant(&self) -> bool {
        self.legacy_literal().is_some()
    }

    /// the literal text of a legacy constant
    pub fn legacy_literal(&self) -> Option<&str> {
        match &self.variant {
            ValueVariant::Const(e) => e
                .single()
                .filter(|item| item.kind == ExpressionType::Input)
                .map(|item| item.value.as_str()),
            ValueVariant::Expression(_) => None,
        }
    }

    /// legacy constant whose literal looks like a number
    pub fn is_numeric_constant(&self) -> bool {
        self.legacy_literal().is_some_and(scalar::is_numeric_str)
    }

    /// the single `Input` token when this value is nothing but a literal
    pub fn pure_literal(&self) -> Option<&ExpressionItem> {
        self.expression_ref()
            .single()
            .filter(|item| item.kind == ExpressionType::Input)
    }

    /// result of a legacy constant, computed without the sandbox
    pub fn legacy_result(&self) -> Option<JsonValue> {
        self.legacy_literal().map(|text| {
            scalar::parse_number(text).unwrap_or_else(|| JsonValue::String(text.to_string()))
        })
    }

    /// generated source for this value
    pub fn code(&self) -> Result<String, CompileError> {
        Ok(compiler::compile_value(self)?.code())
    }

    /// evaluate and coerce to the declared data type
    pub fn get_result(&self, sandbox: &Sandbox, data: &Bindings) -> Result<JsonValue> {
        self.resolve(sandbox, data, true)
    }

    /// like `get_result`, but a coercion mismatch yields null
    pub fn get_result_non_strict(&self, sandbox: &Sandbox, data: &Bindings) -> Result<JsonValue> {
        self.resolve(sandbox, data, false)
    }

    pub(crate) fn resolve(&self, sandbox: &Sandbox, data: &Bindings, strict: bool) -> Result<JsonValue> {
        let raw = match self.legacy_result() {
            Some(literal) => literal,
            None => self.expression_ref().get_result(sandbox, data)?,
        };

        let Some(data_type) = self.data_type else {
            return Ok(raw);
        };

        match coerce(raw, data_type) {
            Ok(value) => Ok(value),
            Err(e) if !strict => {
                warn!(error = %e, "coercion failed, falling back to null");
                Ok(JsonValue::Null)
            }
            Err(e) => Err(e.into()),
        }
    }
}
