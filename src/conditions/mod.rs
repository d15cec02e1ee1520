//! condition trees for flow branching
//!
//! a condition is an AND/OR group over:
//! - compare items: `left <op> right`, with unary operators (empty,
//!   not_empty, valuable, no_valuable) taking no right operand
//! - operation items: the truthiness of a single value
//! - nested groups
//!
//! conditions lower to one boolean program and evaluate in a single sandbox
//! session.

mod eval;
mod parser;
mod types;

pub use parser::parse_condition;
pub use types::{CompareType, Condition, ConditionItem, ConditionNode, Ops};
