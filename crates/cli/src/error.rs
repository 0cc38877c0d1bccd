//! CLI error type.

use partcart_core::{CartError, PriceError};
use partcart_sync::{ConfigError, StoreError, SyncError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Invalid price: {0}")]
    Price(#[from] PriceError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Product {0} not found; pass --name and --price to add it by hand")]
    UnknownProduct(String),
}
