//! value expressions: ordered token lists that evaluate to a single value or
//! to a concatenated string template
//!
//! - `Field` tokens read from the data bindings (optionally through a trans
//!   chain)
//! - `Input` tokens are literals
//! - `Method` tokens call whitelisted functions
//! - display tokens (member, datetime, select, ...) carry a payload that is
//!   resolved without running the sandbox

mod coerce;
mod display;
mod parser;
mod types;
mod value;

pub use coerce::coerce;
pub use parser::{parse_expression, parse_value};
pub use types::{DataType, ExpressionType, ValueType};
pub use value::Value;

pub(crate) use display::static_literal;
pub(crate) use parser::parse_value_at;

use serde_json::Value as JsonValue;

use crate::compiler;
use crate::error::{CompileError, Result};
use crate::sandbox::Sandbox;
use crate::scalar::Bindings;
use crate::trans;

/// a single token of an expression
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionItem {
    pub kind: ExpressionType,
    /// field path, literal text or function name depending on `kind`
    pub value: String,
    /// structured payload, set iff `kind` is a display kind
    pub display_value: Option<JsonValue>,
    pub name: String,
    /// call arguments, only ever non-empty for `Method`
    pub args: Vec<Value>,
    /// discriminant of the value this token belongs to
    pub value_kind: ValueType,
    pub trans: Option<String>,
    /// namespace prefix for field paths
    pub component_id: Option<String>,
}

impl ExpressionItem {
    fn new(kind: ExpressionType, value: impl Into<String>, value_kind: ValueType) -> Self {
        Self {
            kind,
            value: value.into(),
            display_value: None,
            name: String::new(),
            args: Vec::new(),
            value_kind,
            trans: None,
            component_id: None,
        }
    }

    /// lookup into the data bindings (`a.b.c`)
    pub fn field(path: impl Into<String>) -> Self {
        Self::new(ExpressionType::Field, path, ValueType::Expression)
    }

    /// literal token
    pub fn input(value: impl Into<String>, value_kind: ValueType) -> Self {
        Self::new(ExpressionType::Input, value, value_kind)
    }

    /// whitelisted function call
    pub fn method(name: impl Into<String>, args: Vec<Value>) -> Self {
        let name = name.into();
        let mut item = Self::new(ExpressionType::Method, name.clone(), ValueType::Expression);
        item.name = name;
        item.args = args;
        item
    }

    /// display token carrying its payload
    pub fn display(kind: ExpressionType, payload: JsonValue) -> Self {
        let mut item = Self::new(kind, "", ValueType::Expression);
        item.display_value = Some(payload);
        item
    }

    pub fn with_trans(mut self, trans: impl Into<String>) -> Self {
        let trans = trans.into();
        self.trans = (!trans.trim().is_empty()).then_some(trans);
        self
    }

    pub fn with_component(mut self, component_id: impl Into<String>) -> Self {
        self.component_id = Some(component_id.into());
        self
    }

    /// lookup segments, prefixed with the component namespace when set
    pub fn path(&self) -> Vec<String> {
        self.component_id
            .iter()
            .map(String::as_str)
            .chain(self.value.split('.'))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// key the trans pipeline binds the transformed value under
    pub fn trans_key(&self) -> Option<String> {
        self.trans
            .as_deref()
            .map(|chain| trans::binding_key(&self.path().join("."), chain))
    }

    /// name of the called function for `Method` tokens
    pub fn method_name(&self) -> &str {
        if self.name.is_empty() {
            &self.value
        } else {
            &self.name
        }
    }

    pub(crate) fn is_blank_input(&self) -> bool {
        self.kind == ExpressionType::Input && self.value.trim().is_empty()
    }
}

/// ordered token list; a template concatenates its tokens positionally
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    items: Vec<ExpressionItem>,
    is_string_template: bool,
}

impl Expression {
    /// build from tokens, dropping blank `Input` tokens at either boundary
    ///
    /// returns `None` when nothing is left.
    pub fn new(mut items: Vec<ExpressionItem>) -> Option<Self> {
        if items.first().is_some_and(ExpressionItem::is_blank_input) {
            items.remove(0);
        }
        if items.last().is_some_and(ExpressionItem::is_blank_input) {
            items.pop();
        }
        if items.is_empty() {
            return None;
        }
        let is_string_template = items.len() > 1;
        Some(Self {
            items,
            is_string_template,
        })
    }

    pub fn items(&self) -> &[ExpressionItem] {
        &self.items
    }

    pub fn is_string_template(&self) -> bool {
        self.is_string_template
    }

    pub fn set_is_string_template(&mut self, is_string_template: bool) {
        self.is_string_template = is_string_template;
    }

    /// the only token of a non-template expression
    pub fn single(&self) -> Option<&ExpressionItem> {
        match self.items.as_slice() {
            [item] if !self.is_string_template => Some(item),
            _ => None,
        }
    }

    /// every token carrying a trans chain, including inside call arguments
    pub fn trans_items(&self) -> Vec<&ExpressionItem> {
        let mut out = Vec::new();
        self.collect_trans_items(&mut out);
        out
    }

    pub(crate) fn collect_trans_items<'a>(&'a self, out: &mut Vec<&'a ExpressionItem>) {
        for item in &self.items {
            if item.kind == ExpressionType::Field && item.trans.is_some() {
                out.push(item);
            }
            for arg in &item.args {
                arg.expression_ref().collect_trans_items(out);
            }
        }
    }

    /// generated source for this expression
    pub fn code(&self) -> Result<String, CompileError> {
        Ok(compiler::compile_expression(self)?.code())
    }

    /// evaluate against the bindings
    ///
    /// display tokens resolve straight from their payload; everything else
    /// goes through trans binding, lowering and one sandbox session.
    pub fn get_result(&self, sandbox: &Sandbox, data: &Bindings) -> Result<JsonValue> {
        if let Some(item) = self.single().filter(|item| item.kind.is_display()) {
            return display::resolve(item, sandbox, data);
        }

        let bound = trans::bind(self.trans_items(), data)?;
        let program = compiler::compile_expression(self)?;
        Ok(sandbox.execute(&program, &bound)?)
    }
}
