//! Partcart Core - Cart domain types and state transitions.
//!
//! This crate provides the types shared by every Partcart component:
//! - `sync` - Cart synchronization engine (local and remote persistence)
//! - `cli` - Command-line tools for inspecting and maintaining carts
//!
//! # Architecture
//!
//! The core crate contains only types and the pure cart reducer - no I/O, no
//! database access, no timers. This keeps it lightweight and lets the reducer be
//! tested without any store or identity dependency.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices and session identity
//! - [`cart`] - Cart lines, cart state, actions and the reducer

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::*;
pub use types::*;
