//! pure lowering of expression and condition trees to `Node`

use serde_json::Value as JsonValue;

use super::node::{parse_fragment, BinaryOp, Node};
use crate::conditions::{CompareType, Condition, ConditionItem, ConditionNode};
use crate::error::CompileError;
use crate::expression::{Expression, ExpressionItem, ExpressionType, Value, ValueType};
use crate::scalar;

/// literal texts that count as empty when folded at compile time
const EMPTY_LITERALS: [&str; 4] = ["", "0", "false", "[]"];

pub(super) fn value(value: &Value) -> Result<Node, CompileError> {
    match value.legacy_result() {
        Some(literal) => Ok(Node::Literal(literal)),
        None => expression(value.expression_ref()),
    }
}

pub(super) fn expression(expr: &Expression) -> Result<Node, CompileError> {
    let mut nodes = expr
        .items()
        .iter()
        .map(item)
        .collect::<Result<Vec<_>, _>>()?;

    if !expr.is_string_template() && nodes.len() == 1 {
        return Ok(nodes.remove(0));
    }
    Ok(Node::Concat(nodes))
}

fn item(item: &ExpressionItem) -> Result<Node, CompileError> {
    match item.kind {
        ExpressionType::Field => {
            if let Some(key) = item.trans_key() {
                return Ok(Node::Lookup(vec![key]));
            }
            let path = item.path();
            if path.is_empty() {
                return Err(CompileError::UnsupportedItem {
                    kind: item.kind.as_str(),
                    reason: "empty field path".to_string(),
                });
            }
            Ok(Node::Lookup(path))
        }
        ExpressionType::Input => Ok(match item.value_kind {
            ValueType::Const => Node::Literal(
                scalar::parse_number(&item.value)
                    .unwrap_or_else(|| JsonValue::String(item.value.clone())),
            ),
            ValueType::Expression => raw_fragment(item)?,
        }),
        ExpressionType::Method => {
            let name = item.method_name();
            if name.is_empty() {
                return Err(CompileError::UnsupportedItem {
                    kind: item.kind.as_str(),
                    reason: "call without a function name".to_string(),
                });
            }
            Ok(Node::Call {
                name: name.to_string(),
                args: item.args.iter().map(value).collect::<Result<_, _>>()?,
            })
        }
        ExpressionType::Member
        | ExpressionType::Datetime
        | ExpressionType::Multiple
        | ExpressionType::Select
        | ExpressionType::Checkbox
        | ExpressionType::DepartmentNames
        | ExpressionType::Names => crate::expression::static_literal(item).map(Node::Literal),
    }
}

/// verbatim input; interior blanks stand for their own text
fn raw_fragment(item: &ExpressionItem) -> Result<Node, CompileError> {
    if item.value.trim().is_empty() {
        return Ok(Node::Raw {
            code: item.value.clone(),
            value: JsonValue::String(item.value.clone()),
        });
    }
    parse_fragment(&item.value).ok_or_else(|| CompileError::UnsupportedItem {
        kind: item.kind.as_str(),
        reason: format!("unsupported code fragment '{}'", item.value),
    })
}

pub(super) fn condition(cond: &Condition) -> Result<Node, CompileError> {
    let children = cond
        .children()
        .iter()
        .map(|child| match child {
            ConditionNode::Group(group) => condition(group),
            ConditionNode::Item(item) => condition_item(item).map(Node::paren),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Node::Logical {
        op: cond.ops(),
        children,
    })
}

fn condition_item(item: &ConditionItem) -> Result<Node, CompileError> {
    match item {
        ConditionItem::Operation { operands } => value(operands),
        ConditionItem::Compare {
            compare_type,
            left,
            right,
        } => compare(*compare_type, left, right.as_ref()),
    }
}

fn compare(compare_type: CompareType, left: &Value, right: Option<&Value>) -> Result<Node, CompileError> {
    if !compare_type.requires_right() {
        return unary_compare(compare_type, left);
    }

    let right = right.ok_or_else(|| CompileError::UnsupportedItem {
        kind: "compare",
        reason: format!("{} needs a right operand", compare_type),
    })?;
    let loose = left.is_numeric_constant() || right.is_numeric_constant();
    let (l, r) = (value(left)?, value(right)?);

    let contains = |l: Node, r: Node| Node::Contains(Box::new(l), Box::new(r));
    Ok(match compare_type {
        CompareType::Equals if loose => Node::binary(BinaryOp::LooseEq, l, r),
        CompareType::Equals => Node::binary(BinaryOp::StrictEq, l, r),
        CompareType::NotEquals if loose => Node::binary(BinaryOp::LooseNe, l, r),
        CompareType::NotEquals => Node::binary(BinaryOp::StrictNe, l, r),
        CompareType::Contains => contains(l, r),
        CompareType::NoContains => Node::not(contains(l, r)),
        CompareType::Gt => Node::binary(BinaryOp::Gt, l, r),
        CompareType::Lt => Node::binary(BinaryOp::Lt, l, r),
        CompareType::Gte => Node::binary(BinaryOp::Gte, l, r),
        CompareType::Lte => Node::binary(BinaryOp::Lte, l, r),
        CompareType::Empty
        | CompareType::NotEmpty
        | CompareType::Valuable
        | CompareType::NoValuable => return unary_compare(compare_type, left),
    })
}

/// `Empty`/`NotEmpty` test whether the left lookup is unset; `Valuable`/
/// `NoValuable` compare the coalesced value against `''`
fn unary_compare(compare_type: CompareType, left: &Value) -> Result<Node, CompileError> {
    if let Some(literal) = left.pure_literal().and_then(literal_value) {
        let empty = literal.is_null() || EMPTY_LITERALS.contains(&scalar::stringify(&literal).as_str());
        let result = match compare_type {
            CompareType::Empty | CompareType::Valuable => empty,
            _ => !empty,
        };
        return Ok(Node::Literal(JsonValue::Bool(result)));
    }

    let l = value(left)?;
    let blank = || Node::Literal(JsonValue::String(String::new()));
    Ok(match compare_type {
        CompareType::Empty => Node::not(Node::IsSet(Box::new(l))),
        CompareType::NotEmpty => Node::IsSet(Box::new(l)),
        CompareType::Valuable => Node::binary(BinaryOp::LooseEq, Node::Coalesce(Box::new(l)), blank()),
        CompareType::NoValuable => {
            Node::binary(BinaryOp::LooseNe, Node::Coalesce(Box::new(l)), blank())
        }
        other => {
            return Err(CompileError::UnsupportedItem {
                kind: "compare",
                reason: format!("{} is not a unary comparison", other),
            })
        }
    })
}

/// value of a lone literal token, `None` when it needs evaluating
fn literal_value(item: &ExpressionItem) -> Option<JsonValue> {
    match item.value_kind {
        ValueType::Const => Some(
            scalar::parse_number(&item.value).unwrap_or_else(|| JsonValue::String(item.value.clone())),
        ),
        ValueType::Expression => match raw_fragment(item).ok()? {
            Node::Raw { value, .. } => Some(value),
            _ => None,
        },
    }
}
