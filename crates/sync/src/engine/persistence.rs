//! Reading and writing carts in the backing store that matches an identity.

use std::sync::Arc;

use partcart_core::{CartLine, Identity, UserId};
use tracing::{debug, warn};

use crate::config::RemoteWriteStrategy;
use crate::error::StoreError;
use crate::store::{CartItemRecord, LocalCartStore, ProductCatalog, RemoteCartStore};

/// Result of fetching a cart.
///
/// Every variant resolves to a `LOAD`; they differ in what the user is told.
#[derive(Debug)]
pub(crate) enum LoadOutcome {
    Loaded(Vec<CartLine>),
    /// Nothing saved for this identity.
    Empty,
    /// The store could not be read.
    Failed(StoreError),
    /// A saved local cart existed but could not be parsed; it has been removed.
    Unreadable(StoreError),
}

pub(crate) struct Persistence {
    local: Arc<dyn LocalCartStore>,
    remote: Arc<dyn RemoteCartStore>,
    catalog: Arc<dyn ProductCatalog>,
    storage_key: String,
    strategy: RemoteWriteStrategy,
}

impl Persistence {
    pub(crate) fn new(
        local: Arc<dyn LocalCartStore>,
        remote: Arc<dyn RemoteCartStore>,
        catalog: Arc<dyn ProductCatalog>,
        storage_key: String,
        strategy: RemoteWriteStrategy,
    ) -> Self {
        Self {
            local,
            remote,
            catalog,
            storage_key,
            strategy,
        }
    }

    pub(crate) async fn load(&self, identity: &Identity) -> LoadOutcome {
        match identity {
            Identity::Anonymous => self.load_local(),
            Identity::Authenticated(user_id) => self.load_remote(user_id).await,
        }
    }

    /// Persist `lines`. `baseline` is the last cart known to be in the store,
    /// or `None` when that is unknown.
    pub(crate) async fn write(
        &self,
        identity: &Identity,
        lines: &[CartLine],
        baseline: Option<&[CartLine]>,
    ) -> Result<(), StoreError> {
        match identity {
            Identity::Anonymous => {
                let raw = serde_json::to_string(lines)?;
                self.local.set(&self.storage_key, &raw)
            }
            Identity::Authenticated(user_id) => match (self.strategy, baseline) {
                (RemoteWriteStrategy::Diff, Some(baseline)) => {
                    self.write_diff(user_id, lines, baseline).await
                }
                _ => self.write_replace(user_id, lines).await,
            },
        }
    }

    /// Remove the stored cart for `identity` entirely.
    pub(crate) async fn clear(&self, identity: &Identity) -> Result<(), StoreError> {
        match identity {
            Identity::Anonymous => self.local.delete(&self.storage_key),
            Identity::Authenticated(user_id) => self.remote.delete_by_user(user_id).await,
        }
    }

    fn load_local(&self) -> LoadOutcome {
        let raw = match self.local.get(&self.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return LoadOutcome::Empty,
            Err(e) => return LoadOutcome::Failed(e),
        };

        match serde_json::from_str::<Vec<CartLine>>(&raw) {
            Ok(lines) if lines.is_empty() => LoadOutcome::Empty,
            Ok(lines) => LoadOutcome::Loaded(lines),
            Err(e) => {
                if let Err(delete_err) = self.local.delete(&self.storage_key) {
                    warn!(error = %delete_err, "Failed to remove unreadable local cart");
                }
                LoadOutcome::Unreadable(e.into())
            }
        }
    }

    async fn load_remote(&self, user_id: &UserId) -> LoadOutcome {
        let rows = match self.remote.list_by_user(user_id).await {
            Ok(rows) if rows.is_empty() => return LoadOutcome::Empty,
            Ok(rows) => rows,
            Err(e) => return LoadOutcome::Failed(e),
        };

        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            let product = match row.product {
                Some(product) => Some(product),
                None => match self.catalog.get_by_id(&row.product_id).await {
                    Ok(product) => product,
                    Err(e) => return LoadOutcome::Failed(e),
                },
            };

            match product {
                Some(product) => lines.push(product.to_line_input().into_line(row.quantity)),
                None => warn!(
                    user_id = %user_id,
                    product_id = %row.product_id,
                    "Dropping cart row for unknown product"
                ),
            }
        }
        LoadOutcome::Loaded(lines)
    }

    async fn write_diff(
        &self,
        user_id: &UserId,
        lines: &[CartLine],
        baseline: &[CartLine],
    ) -> Result<(), StoreError> {
        let mut deleted = 0_usize;
        for old in baseline {
            if !lines.iter().any(|line| line.product_id() == old.product_id()) {
                self.remote.delete_one(user_id, old.product_id()).await?;
                deleted += 1;
            }
        }

        let mut upserted = 0_usize;
        for line in lines {
            let unchanged = baseline
                .iter()
                .any(|old| old.product_id() == line.product_id() && old.quantity == line.quantity);
            if !unchanged {
                self.remote.upsert(&record(user_id, line)).await?;
                upserted += 1;
            }
        }

        debug!(user_id = %user_id, upserted, deleted, "Wrote remote cart diff");
        Ok(())
    }

    async fn write_replace(&self, user_id: &UserId, lines: &[CartLine]) -> Result<(), StoreError> {
        self.remote.delete_by_user(user_id).await?;
        for line in lines {
            self.remote.upsert(&record(user_id, line)).await?;
        }
        debug!(user_id = %user_id, lines = lines.len(), "Replaced remote cart");
        Ok(())
    }
}

fn record(user_id: &UserId, line: &CartLine) -> CartItemRecord {
    CartItemRecord {
        user_id: user_id.clone(),
        product_id: line.product_id().clone(),
        quantity: line.quantity,
    }
}
