//! exit codes for flowexpr commands
//!
//! these follow Unix conventions where 0 = success and non-zero = error
//! specific codes help scripts distinguish between failure types

#![allow(dead_code)]

/// command completed successfully
pub const SUCCESS: i32 = 0;

/// general or unknown error
pub const ERROR: i32 = 1;

/// malformed value or condition definition
pub const BUILD_ERROR: i32 = 2;

/// definition could not be compiled or was rejected by the sandbox
pub const COMPILE_ERROR: i32 = 3;

/// program failed while executing
pub const EXECUTION_ERROR: i32 = 4;

/// result does not fit the declared data type
pub const COERCION_ERROR: i32 = 5;

/// invalid trans chain or transform input
pub const TRANS_ERROR: i32 = 6;

/// configuration file error
pub const CONFIG_ERROR: i32 = 7;
