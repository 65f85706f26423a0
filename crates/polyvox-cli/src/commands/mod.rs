//! CLI command implementations.

pub mod common;
pub mod replay;
pub mod tuning;
