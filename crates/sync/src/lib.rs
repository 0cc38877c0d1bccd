//! Partcart Sync - Cart synchronization engine.
//!
//! Keeps an in-memory cart consistent with whichever backing store matches the
//! current session identity:
//!
//! - Anonymous sessions persist the full line list to a device-local store.
//! - Authenticated sessions persist `(user, product, quantity)` rows to a remote
//!   store and rehydrate product detail from the catalog on load.
//!
//! Mutations are applied synchronously by the pure reducer in `partcart-core`.
//! A single reconciliation task observes state changes, debounces them into
//! one write per burst, and reloads the cart whenever identity changes.
//!
//! # Example
//!
//! ```rust,ignore
//! use partcart_sync::{CartEngine, Collaborators, IdentitySource, SyncConfig};
//!
//! let identity = IdentitySource::anonymous();
//! let engine = CartEngine::start(SyncConfig::from_env()?, collaborators, identity.subscribe());
//!
//! engine.dispatch(CartAction::Add(input))?;
//! identity.sign_in(UserId::new("user-1"));
//! engine.shutdown().await;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod identity;
pub mod notify;
pub mod store;

pub use config::{ConfigError, RemoteWriteStrategy, SyncConfig};
pub use engine::{CartEngine, CartHandle, Collaborators, SyncPhase, SyncStatus};
pub use error::{StoreError, SyncError};
pub use identity::{IdentityEvent, IdentitySource};
pub use notify::{Notifier, NotifyLevel, TracingNotifier};
