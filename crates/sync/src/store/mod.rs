//! Backing store and catalog collaborators.
//!
//! # Stores
//!
//! - [`LocalCartStore`] - synchronous key/value storage for anonymous carts
//!   (the whole line list serialized under one key)
//! - [`RemoteCartStore`] - durable per-user rows of `(product, quantity)`
//! - [`ProductCatalog`] - read-only product lookup used to rehydrate remote rows
//!
//! # Implementations
//!
//! - [`memory`] - in-process stores for tests and simulations
//! - [`file`] - JSON files in a data directory, one per key
//! - [`cached`] - `moka` TTL cache in front of any catalog
//! - [`crate::db`] - `PostgreSQL` remote store and catalog

pub mod cached;
pub mod file;
pub mod memory;

use async_trait::async_trait;
use partcart_core::{CartLineInput, PLACEHOLDER_IMAGE, Price, ProductId, UserId};

use crate::error::StoreError;

pub use cached::CachedCatalog;
pub use file::FileLocalStore;
pub use memory::{LocalOp, MemoryCatalog, MemoryLocalStore, MemoryRemoteStore, RemoteOp};

/// One persisted row of an authenticated cart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CartItemRecord {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Product detail as known by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub part_number: String,
    pub price: Price,
    pub image: Option<String>,
    pub in_stock: bool,
}

impl CatalogProduct {
    /// Product data as captured into a cart line.
    #[must_use]
    pub fn to_line_input(&self) -> CartLineInput {
        CartLineInput {
            product_id: self.id.clone(),
            name: self.name.clone(),
            brand: self.brand.clone(),
            part_number: self.part_number.clone(),
            unit_price: self.price,
            image: self
                .image
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            in_stock: self.in_stock,
        }
    }
}

/// A remote cart row, optionally joined with its product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCartRow {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Joined product detail, if the store could resolve it.
    pub product: Option<CatalogProduct>,
}

/// Device-local storage for anonymous carts.
pub trait LocalCartStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the storage cannot be written.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Durable per-user cart rows keyed by `(user_id, product_id)`.
#[async_trait]
pub trait RemoteCartStore: Send + Sync {
    /// List every row for a user, joined with product detail where available.
    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<RemoteCartRow>, StoreError>;

    /// Insert or update one row.
    async fn upsert(&self, record: &CartItemRecord) -> Result<(), StoreError>;

    /// Delete every row for a user.
    async fn delete_by_user(&self, user_id: &UserId) -> Result<(), StoreError>;

    /// Delete one row. Missing rows are not an error.
    async fn delete_one(&self, user_id: &UserId, product_id: &ProductId) -> Result<(), StoreError>;
}

/// Read-only product lookup.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn get_by_id(&self, product_id: &ProductId) -> Result<Option<CatalogProduct>, StoreError>;
}
