//! Core types for Partcart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod identity;
pub mod price;

pub use id::*;
pub use identity::Identity;
pub use price::{Price, PriceError};
