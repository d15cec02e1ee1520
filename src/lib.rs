// library crate for flowexpr
// value expressions and branch conditions for workflow nodes, compiled to a
// small program and evaluated in a whitelisted sandbox

pub mod cli;
pub mod compiler;
pub mod conditions;
pub mod config;
pub mod error;
pub mod expression;
pub mod sandbox;
pub mod scalar;
pub mod trans;

mod suggest;

pub use conditions::{parse_condition, CompareType, Condition, ConditionItem, ConditionNode, Ops};
pub use error::{BuildError, CoercionError, CompileError, Error, Result};
pub use expression::{
    parse_expression, parse_value, DataType, Expression, ExpressionItem, ExpressionType, Value,
    ValueType,
};
pub use sandbox::{FunctionGroup, Registry, Sandbox, SandboxError};
pub use scalar::Bindings;
pub use trans::{TransChain, TransError};
