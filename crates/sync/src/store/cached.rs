//! Catalog lookups cached with `moka`.
//!
//! Rehydrating a signed-in cart looks up every product it contains. The cache
//! keeps recent lookups (including "not found") for a short TTL so repeated
//! loads do not hit the catalog for each line.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use partcart_core::ProductId;
use tracing::{debug, instrument};

use super::{CatalogProduct, ProductCatalog};
use crate::error::StoreError;

const MAX_CACHED_PRODUCTS: u64 = 1000;

/// A [`ProductCatalog`] wrapper with a TTL cache.
pub struct CachedCatalog {
    inner: Arc<dyn ProductCatalog>,
    cache: Cache<ProductId, Option<CatalogProduct>>,
}

impl CachedCatalog {
    /// Wrap `inner`, caching lookups for `ttl`.
    #[must_use]
    pub fn new(inner: Arc<dyn ProductCatalog>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_CACHED_PRODUCTS)
            .time_to_live(ttl)
            .build();
        Self { inner, cache }
    }

    /// Drop every cached lookup.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

#[async_trait]
impl ProductCatalog for CachedCatalog {
    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn get_by_id(&self, product_id: &ProductId) -> Result<Option<CatalogProduct>, StoreError> {
        if let Some(cached) = self.cache.get(product_id).await {
            debug!("Cache hit for product");
            return Ok(cached);
        }

        // Errors are not cached.
        let product = self.inner.get_by_id(product_id).await?;
        self.cache.insert(product_id.clone(), product.clone()).await;
        Ok(product)
    }
}
