//! Error types for the synchronization engine.

use partcart_core::CartError;
use thiserror::Error;

/// Failure reported by a backing store or catalog collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored cart could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local storage I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the engine's public operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The reducer rejected the action.
    #[error("invalid cart action: {0}")]
    Cart(#[from] CartError),

    /// Persisting to the backing store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The reconciliation task is no longer running.
    #[error("cart engine has stopped")]
    EngineStopped,
}

#[cfg(test)]
mod tests {
    use partcart_core::ProductId;

    use super::*;

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::from(CartError::NegativeQuantity {
            product_id: ProductId::new("P1"),
            quantity: -2,
        });
        assert_eq!(
            err.to_string(),
            "invalid cart action: quantity for P1 cannot be negative (got -2)"
        );

        let err = SyncError::from(StoreError::Unavailable("timeout".to_string()));
        assert_eq!(err.to_string(), "store error: store unavailable: timeout");
    }
}
