//! In-process stores.
//!
//! Used by simulations and tests. Each store keeps a journal of the write
//! operations it received so callers can assert exactly what was persisted, and
//! can be told to fail to exercise error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use partcart_core::{ProductId, UserId};

use super::{
    CartItemRecord, CatalogProduct, LocalCartStore, ProductCatalog, RemoteCartRow, RemoteCartStore,
};
use crate::error::StoreError;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Local store
// =============================================================================

/// A write received by a [`MemoryLocalStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalOp {
    Set { key: String, value: String },
    Delete { key: String },
}

/// Local storage held in a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    entries: Mutex<HashMap<String, String>>,
    journal: Mutex<Vec<LocalOp>>,
    fail_writes: AtomicBool,
}

impl MemoryLocalStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without recording it in the journal.
    pub fn seed(&self, key: &str, value: &str) {
        lock(&self.entries).insert(key.to_string(), value.to_string());
    }

    /// Current value under `key`.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    /// Writes received so far.
    #[must_use]
    pub fn journal(&self) -> Vec<LocalOp> {
        lock(&self.journal).clone()
    }

    /// Make subsequent writes fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("local storage is full".to_string()));
        }
        Ok(())
    }
}

impl LocalCartStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.value(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        lock(&self.entries).insert(key.to_string(), value.to_string());
        lock(&self.journal).push(LocalOp::Set {
            key: key.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        lock(&self.entries).remove(key);
        lock(&self.journal).push(LocalOp::Delete {
            key: key.to_string(),
        });
        Ok(())
    }
}

// =============================================================================
// Remote store
// =============================================================================

/// A write received by a [`MemoryRemoteStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOp {
    Upsert(CartItemRecord),
    DeleteByUser(UserId),
    DeleteOne(UserId, ProductId),
}

/// Remote cart rows held in memory.
///
/// Rows keep insertion order per user. Rows are joined against the products
/// registered with [`MemoryRemoteStore::with_products`], mimicking a foreign-key
/// join in the hosted database.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    rows: Mutex<HashMap<UserId, Vec<(ProductId, u32)>>>,
    products: HashMap<ProductId, CatalogProduct>,
    journal: Mutex<Vec<RemoteOp>>,
    latency: Option<Duration>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryRemoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Join rows against these products when listing.
    #[must_use]
    pub fn with_products(mut self, products: impl IntoIterator<Item = CatalogProduct>) -> Self {
        self.products = products.into_iter().map(|p| (p.id.clone(), p)).collect();
        self
    }

    /// Delay every operation by `latency`.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Seed rows for a user without recording them in the journal.
    pub fn seed(&self, user_id: &UserId, rows: &[(&str, u32)]) {
        let rows = rows
            .iter()
            .map(|(id, qty)| (ProductId::new(*id), *qty))
            .collect();
        lock(&self.rows).insert(user_id.clone(), rows);
    }

    /// Current `(product, quantity)` rows for a user.
    #[must_use]
    pub fn rows(&self, user_id: &UserId) -> Vec<(ProductId, u32)> {
        lock(&self.rows).get(user_id).cloned().unwrap_or_default()
    }

    /// Writes received so far.
    #[must_use]
    pub fn journal(&self) -> Vec<RemoteOp> {
        lock(&self.journal).clone()
    }

    /// Make subsequent reads fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check(&self, flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("remote store unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteCartStore for MemoryRemoteStore {
    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<RemoteCartRow>, StoreError> {
        self.simulate_latency().await;
        self.check(&self.fail_reads)?;
        Ok(self
            .rows(user_id)
            .into_iter()
            .map(|(product_id, quantity)| RemoteCartRow {
                product: self.products.get(&product_id).cloned(),
                product_id,
                quantity,
            })
            .collect())
    }

    async fn upsert(&self, record: &CartItemRecord) -> Result<(), StoreError> {
        self.simulate_latency().await;
        self.check(&self.fail_writes)?;
        {
            let mut rows = lock(&self.rows);
            let user_rows = rows.entry(record.user_id.clone()).or_default();
            match user_rows.iter_mut().find(|(id, _)| *id == record.product_id) {
                Some(row) => row.1 = record.quantity,
                None => user_rows.push((record.product_id.clone(), record.quantity)),
            }
        }
        lock(&self.journal).push(RemoteOp::Upsert(record.clone()));
        Ok(())
    }

    async fn delete_by_user(&self, user_id: &UserId) -> Result<(), StoreError> {
        self.simulate_latency().await;
        self.check(&self.fail_writes)?;
        lock(&self.rows).remove(user_id);
        lock(&self.journal).push(RemoteOp::DeleteByUser(user_id.clone()));
        Ok(())
    }

    async fn delete_one(&self, user_id: &UserId, product_id: &ProductId) -> Result<(), StoreError> {
        self.simulate_latency().await;
        self.check(&self.fail_writes)?;
        if let Some(user_rows) = lock(&self.rows).get_mut(user_id) {
            user_rows.retain(|(id, _)| id != product_id);
        }
        lock(&self.journal).push(RemoteOp::DeleteOne(user_id.clone(), product_id.clone()));
        Ok(())
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Product catalog held in a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    products: Mutex<HashMap<ProductId, CatalogProduct>>,
    lookups: AtomicUsize,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new(products: impl IntoIterator<Item = CatalogProduct>) -> Self {
        Self {
            products: Mutex::new(products.into_iter().map(|p| (p.id.clone(), p)).collect()),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Add or replace a product.
    pub fn insert(&self, product: CatalogProduct) {
        lock(&self.products).insert(product.id.clone(), product);
    }

    /// Remove a product.
    pub fn remove(&self, product_id: &ProductId) {
        lock(&self.products).remove(product_id);
    }

    /// Number of `get_by_id` calls served.
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductCatalog for MemoryCatalog {
    async fn get_by_id(&self, product_id: &ProductId) -> Result<Option<CatalogProduct>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.products).get(product_id).cloned())
    }
}
