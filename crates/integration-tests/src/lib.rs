//! Integration tests for Partcart.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory and file-backed scenarios
//! cargo test -p partcart-integration-tests
//!
//! # PostgreSQL scenarios (needs a migrated database)
//! DATABASE_URL=postgres://localhost/partcart_test \
//!     cargo test -p partcart-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `cart_sync` - End-to-end engine scenarios over in-memory stores
//! - `file_store` - Anonymous carts persisted to disk across engine restarts
//! - `postgres_cart` - Signed-in carts against `PostgreSQL`

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use partcart_core::{CartLine, CartLineInput, Identity, Price, ProductId};
use partcart_sync::store::{
    CatalogProduct, LocalCartStore, MemoryCatalog, MemoryLocalStore, MemoryRemoteStore,
};
use partcart_sync::{CartEngine, Collaborators, IdentitySource, Notifier, NotifyLevel, SyncConfig};

/// Notifier that keeps every message for later assertions.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(NotifyLevel, String)>>,
}

impl RecordingNotifier {
    /// Messages received so far.
    #[must_use]
    pub fn messages(&self) -> Vec<(NotifyLevel, String)> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }
}

/// A catalog product priced in cents. Negative prices fall back to zero.
#[must_use]
pub fn product(id: &str, name: &str, cents: i64) -> CatalogProduct {
    CatalogProduct {
        id: ProductId::new(id),
        name: name.to_string(),
        brand: "Acme".to_string(),
        part_number: format!("ACME-{id}"),
        price: Price::from_cents(cents).unwrap_or(Price::ZERO),
        image: Some(format!("/images/{id}.webp")),
        in_stock: true,
    }
}

/// Add-to-cart input for a catalog product.
#[must_use]
pub fn input(product: &CatalogProduct) -> CartLineInput {
    product.to_line_input()
}

/// Default engine settings without the catalog cache.
#[must_use]
pub fn test_config() -> SyncConfig {
    SyncConfig {
        catalog_cache_ttl: None,
        ..SyncConfig::default()
    }
}

/// In-memory stores plus an identity source.
pub struct TestContext {
    pub identity: IdentitySource,
    pub local: Arc<MemoryLocalStore>,
    pub remote: Arc<MemoryRemoteStore>,
    pub catalog: Arc<MemoryCatalog>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestContext {
    /// Context starting at `initial` with a two-product catalog: `P1` at 10.00
    /// and `P2` at 15.00.
    #[must_use]
    pub fn new(initial: Identity) -> Self {
        Self::with_remote(initial, MemoryRemoteStore::new())
    }

    /// Like [`TestContext::new`] with a custom remote store.
    #[must_use]
    pub fn with_remote(initial: Identity, remote: MemoryRemoteStore) -> Self {
        Self {
            identity: IdentitySource::new(initial),
            local: Arc::new(MemoryLocalStore::new()),
            remote: Arc::new(remote),
            catalog: Arc::new(MemoryCatalog::new([
                product("P1", "Brake pads", 1000),
                product("P2", "Oil filter", 1500),
            ])),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    /// Start an engine over this context's stores.
    #[must_use]
    pub fn start(&self, config: SyncConfig) -> CartEngine {
        self.start_with_local(config, self.local.clone())
    }

    /// Start an engine with a different local store.
    #[must_use]
    pub fn start_with_local(&self, config: SyncConfig, local: Arc<dyn LocalCartStore>) -> CartEngine {
        CartEngine::start(
            config,
            Collaborators {
                local,
                remote: self.remote.clone(),
                catalog: self.catalog.clone(),
                notifier: self.notifier.clone(),
            },
            self.identity.subscribe(),
        )
    }

    /// Lines held by the in-memory local store under `key`.
    #[must_use]
    pub fn local_lines(&self, key: &str) -> Option<Vec<CartLine>> {
        self.local
            .value(key)
            .and_then(|raw| serde_json::from_str(&raw).ok())
    }
}

/// A fresh directory under the system temp dir.
#[must_use]
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "partcart-it-{name}-{}-{:?}",
        std::process::id(),
        std::thread::current().id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}
