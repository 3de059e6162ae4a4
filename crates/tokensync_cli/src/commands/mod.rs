//! CLI command implementations.

pub mod load;
pub mod merge;
