//! CLI command implementations.

pub mod cart;
pub mod migrate;
pub mod simulate;
