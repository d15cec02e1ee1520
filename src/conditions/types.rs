//! core types for the condition system

use std::fmt;

use crate::error::BuildError;
use crate::expression::{ExpressionItem, Value};

/// logical operator joining the children of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ops {
    /// AND, and, &&, all
    And,
    /// OR, or, ||, any
    Or,
}

impl Ops {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "and" | "&&" | "all" => Some(Ops::And),
            "or" | "||" | "any" => Some(Ops::Or),
            _ => None,
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            Ops::And => "&&",
            Ops::Or => "||",
        }
    }
}

impl fmt::Display for Ops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ops::And => write!(f, "AND"),
            Ops::Or => write!(f, "OR"),
        }
    }
}

/// comparison operators supported in compare items
///
/// `Empty`/`NotEmpty` test whether the left operand is set, and
/// `Valuable`/`NoValuable` whether it coalesces to `''`. the names read the
/// other way round; flows in the wild depend on this truth table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareType {
    /// equals, eq, ==
    Equals,
    /// not_equals, ne, !=
    NotEquals,
    /// contains, like
    Contains,
    /// no_contains, not_contains, not_like
    NoContains,
    /// gt, >, greater_than
    Gt,
    /// lt, <, less_than
    Lt,
    /// gte, >=, greater_than_or_equal
    Gte,
    /// lte, <=, less_than_or_equal
    Lte,
    /// empty, is_empty
    Empty,
    /// not_empty, no_empty
    NotEmpty,
    /// valuable
    Valuable,
    /// no_valuable, not_valuable
    NoValuable,
}

impl CompareType {
    /// parse operator from string (supports all forms, case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equals" | "equal" | "eq" | "==" => Some(CompareType::Equals),
            "not_equals" | "not_equal" | "no_equals" | "ne" | "!=" => Some(CompareType::NotEquals),
            "contains" | "contain" | "like" => Some(CompareType::Contains),
            "no_contains" | "not_contains" | "not_contain" | "not_like" => {
                Some(CompareType::NoContains)
            }
            "gt" | ">" | "greater_than" => Some(CompareType::Gt),
            "lt" | "<" | "less_than" => Some(CompareType::Lt),
            "gte" | ">=" | "greater_than_or_equal" => Some(CompareType::Gte),
            "lte" | "<=" | "less_than_or_equal" => Some(CompareType::Lte),
            "empty" | "is_empty" => Some(CompareType::Empty),
            "not_empty" | "no_empty" | "is_not_empty" => Some(CompareType::NotEmpty),
            "valuable" => Some(CompareType::Valuable),
            "no_valuable" | "not_valuable" => Some(CompareType::NoValuable),
            _ => None,
        }
    }

    /// whether the operator takes a right operand
    pub fn requires_right(&self) -> bool {
        !matches!(
            self,
            CompareType::Empty
                | CompareType::NotEmpty
                | CompareType::Valuable
                | CompareType::NoValuable
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompareType::Equals => "equals",
            CompareType::NotEquals => "not_equals",
            CompareType::Contains => "contains",
            CompareType::NoContains => "no_contains",
            CompareType::Gt => "gt",
            CompareType::Lt => "lt",
            CompareType::Gte => "gte",
            CompareType::Lte => "lte",
            CompareType::Empty => "empty",
            CompareType::NotEmpty => "not_empty",
            CompareType::Valuable => "valuable",
            CompareType::NoValuable => "no_valuable",
        }
    }
}

impl fmt::Display for CompareType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// a leaf of a condition tree
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionItem {
    /// truthiness of one value
    Operation { operands: Value },
    /// two values joined by a comparison
    Compare {
        compare_type: CompareType,
        left: Value,
        right: Option<Value>,
    },
}

impl ConditionItem {
    pub fn operation(operands: Value) -> Self {
        ConditionItem::Operation { operands }
    }

    /// build a compare item; `right` is required iff the operator needs it
    /// and ignored otherwise
    pub fn compare(
        compare_type: CompareType,
        left: Value,
        right: Option<Value>,
    ) -> Result<Self, BuildError> {
        let right = match (compare_type.requires_right(), right) {
            (true, None) => {
                return Err(BuildError::new(
                    format!("'{}' requires a right operand", compare_type),
                    "right_operands",
                ))
            }
            (true, right) => right,
            (false, _) => None,
        };
        Ok(ConditionItem::Compare {
            compare_type,
            left,
            right,
        })
    }

    pub fn values(&self) -> Vec<&Value> {
        match self {
            ConditionItem::Operation { operands } => vec![operands],
            ConditionItem::Compare { left, right, .. } => {
                std::iter::once(left).chain(right.as_ref()).collect()
            }
        }
    }
}

/// a child of a group: a nested group or a leaf
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    Group(Condition),
    Item(ConditionItem),
}

impl From<Condition> for ConditionNode {
    fn from(cond: Condition) -> Self {
        ConditionNode::Group(cond)
    }
}

impl From<ConditionItem> for ConditionNode {
    fn from(item: ConditionItem) -> Self {
        ConditionNode::Item(item)
    }
}

/// the condition AST: an AND/OR group over items and nested groups
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    ops: Ops,
    children: Vec<ConditionNode>,
}

impl Condition {
    /// build without validation; callers validate the root once
    pub(crate) fn from_parts(ops: Ops, children: Vec<ConditionNode>) -> Self {
        Self { ops, children }
    }

    pub fn ops(&self) -> Ops {
        self.ops
    }

    pub fn children(&self) -> &[ConditionNode] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// every token carrying a trans chain, across the whole tree
    pub fn trans_items(&self) -> Vec<&ExpressionItem> {
        let mut out = Vec::new();
        self.collect_trans_items(&mut out);
        out
    }

    fn collect_trans_items<'a>(&'a self, out: &mut Vec<&'a ExpressionItem>) {
        for child in &self.children {
            match child {
                ConditionNode::Group(group) => group.collect_trans_items(out),
                ConditionNode::Item(item) => {
                    for value in item.values() {
                        value.expression_ref().collect_trans_items(out);
                    }
                }
            }
        }
    }
}
