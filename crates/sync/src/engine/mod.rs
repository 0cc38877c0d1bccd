//! The cart engine: synchronous mutations plus background reconciliation.
//!
//! [`CartEngine::start`] spawns one reconciliation task and returns a handle.
//! Mutations go through [`CartHandle::dispatch`], which runs the reducer
//! immediately and returns; the task observes the resulting state changes,
//! debounces them and writes the final state to the store that matches the
//! current identity. Identity changes reload the cart from the new store.
//!
//! # Phases
//!
//! ```text
//! Uninitialized -> Loading -> Ready -> PendingWrite -> Writing -> Ready
//!                     ^                                            |
//!                     +------------- identity change --------------+
//! ```

mod cell;
mod persistence;
mod reconciler;

use std::ops::Deref;
use std::sync::Arc;

use partcart_core::{CartAction, CartError, CartLineInput, CartState, Identity, ProductId};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info_span};

use crate::config::SyncConfig;
use crate::error::{StoreError, SyncError};
use crate::notify::Notifier;
use crate::store::{CachedCatalog, LocalCartStore, ProductCatalog, RemoteCartStore};

use cell::CartCell;
use persistence::Persistence;
use reconciler::Reconciler;

/// Where the reconciliation task currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Started, nothing loaded yet.
    Uninitialized,
    /// Fetching the cart for the current identity.
    Loading,
    /// In memory and store agree as far as the engine knows.
    Ready,
    /// A debounced write is scheduled.
    PendingWrite,
    /// A write is in flight.
    Writing,
    /// The task has exited.
    Stopped,
}

impl SyncPhase {
    /// Whether the cart for the current identity has been loaded.
    #[must_use]
    pub const fn is_loaded(self) -> bool {
        matches!(self, Self::Ready | Self::PendingWrite | Self::Writing)
    }
}

/// Snapshot of the reconciliation task, published on every phase change.
///
/// Serializes as `{"phase": "loading", "identity": {...}, "generation": 2}` for
/// hosts that forward it to a UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    /// Identity the phase applies to; `None` before the first load starts.
    pub identity: Option<Identity>,
    /// Bumped on every identity change and checkout-clear.
    pub generation: u64,
}

impl SyncStatus {
    const fn initial() -> Self {
        Self {
            phase: SyncPhase::Uninitialized,
            identity: None,
            generation: 0,
        }
    }
}

/// Stores and sinks the engine talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub local: Arc<dyn LocalCartStore>,
    pub remote: Arc<dyn RemoteCartStore>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug)]
enum Command {
    CheckoutClear(oneshot::Sender<Result<(), StoreError>>),
    Shutdown,
}

/// Cloneable access to a running engine.
#[derive(Debug, Clone)]
pub struct CartHandle {
    cell: Arc<CartCell>,
    status: watch::Receiver<SyncStatus>,
    commands: mpsc::UnboundedSender<Command>,
}

impl CartHandle {
    /// Current cart state.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.cell.snapshot()
    }

    /// Apply `action` to the in-memory cart.
    ///
    /// Returns as soon as the reducer has run; persistence happens in the
    /// background.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the reducer rejects the action. The state is left
    /// unchanged.
    pub fn dispatch(&self, action: CartAction) -> Result<(), CartError> {
        let changed = self.cell.apply(&action)?;
        debug!(action = action.name(), changed, "Dispatched cart action");
        Ok(())
    }

    /// Add one unit of a product.
    ///
    /// # Errors
    ///
    /// Returns `CartError::QuantityOverflow` if the line is already at the
    /// maximum quantity.
    pub fn add(&self, input: CartLineInput) -> Result<(), CartError> {
        self.dispatch(CartAction::Add(input))
    }

    /// Remove a product's line.
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` mirrors [`Self::dispatch`].
    pub fn remove(&self, product_id: impl Into<ProductId>) -> Result<(), CartError> {
        self.dispatch(CartAction::Remove(product_id.into()))
    }

    /// Set a product's quantity; zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError` for negative or out-of-range quantities.
    pub fn set_quantity(
        &self,
        product_id: impl Into<ProductId>,
        quantity: i64,
    ) -> Result<(), CartError> {
        self.dispatch(CartAction::SetQuantity {
            product_id: product_id.into(),
            quantity,
        })
    }

    /// Empty the cart. The empty cart is persisted after the usual debounce.
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` mirrors [`Self::dispatch`].
    pub fn clear(&self) -> Result<(), CartError> {
        self.dispatch(CartAction::Clear)
    }

    /// Watch the cart state. The receiver starts with the current state marked
    /// as seen.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.cell.subscribe()
    }

    /// Current sync status.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    /// Watch the sync status.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.clone()
    }

    /// Wait until the cart for `identity` has been loaded.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::EngineStopped` if the engine stops first.
    pub async fn wait_until_ready(&self, identity: &Identity) -> Result<(), SyncError> {
        let mut status = self.status.clone();
        let ready = status
            .wait_for(|status| {
                status.phase == SyncPhase::Stopped
                    || (status.phase.is_loaded() && status.identity.as_ref() == Some(identity))
            })
            .await
            .map(|status| status.phase != SyncPhase::Stopped)
            .unwrap_or(false);

        if ready {
            Ok(())
        } else {
            Err(SyncError::EngineStopped)
        }
    }

    /// Empty the cart and the current identity's stored cart, bypassing the
    /// debounce. The store is empty once this returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Store` if the store could not be cleared (the
    /// in-memory cart stays empty), or `SyncError::EngineStopped`.
    pub async fn checkout_clear(&self) -> Result<(), SyncError> {
        self.cell.checkout_clear();

        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::CheckoutClear(reply))
            .map_err(|_| SyncError::EngineStopped)?;
        response.await.map_err(|_| SyncError::EngineStopped)??;
        Ok(())
    }
}

/// A running cart engine.
///
/// Dereferences to its [`CartHandle`]. Dropping the engine and every handle
/// stops the task without flushing; call [`CartEngine::shutdown`] to flush a
/// pending write first.
#[derive(Debug)]
pub struct CartEngine {
    handle: CartHandle,
    task: JoinHandle<()>,
}

impl CartEngine {
    /// Spawn the reconciliation task on the current tokio runtime.
    ///
    /// The first load uses the identity currently held by `identity`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn start(
        config: SyncConfig,
        collaborators: Collaborators,
        identity: watch::Receiver<Identity>,
    ) -> Self {
        let Collaborators {
            local,
            remote,
            catalog,
            notifier,
        } = collaborators;

        let catalog: Arc<dyn ProductCatalog> = match config.catalog_cache_ttl {
            Some(ttl) => Arc::new(CachedCatalog::new(catalog, ttl)),
            None => catalog,
        };
        let persistence = Persistence::new(
            local,
            remote,
            catalog,
            config.local_storage_key.clone(),
            config.remote_write,
        );

        let cell = Arc::new(CartCell::new());
        let (status_tx, status_rx) = watch::channel(SyncStatus::initial());
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let reconciler = Reconciler::new(
            config,
            persistence,
            notifier,
            Arc::clone(&cell),
            identity,
            command_rx,
            status_tx,
        );
        let task = tokio::spawn(reconciler.run().instrument(info_span!("cart_sync")));

        Self {
            handle: CartHandle {
                cell,
                status: status_rx,
                commands: command_tx,
            },
            task,
        }
    }

    /// A cloneable handle to this engine.
    #[must_use]
    pub fn handle(&self) -> CartHandle {
        self.handle.clone()
    }

    /// Flush any pending write for the current identity and stop the task.
    pub async fn shutdown(self) {
        // An Err means the task already exited.
        let _ = self.handle.commands.send(Command::Shutdown);
        if let Err(e) = self.task.await {
            error!(error = %e, "Cart sync task failed");
        }
    }
}

impl Deref for CartEngine {
    type Target = CartHandle;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use partcart_core::{CartLine, Price, UserId};
    use rust_decimal::Decimal;

    use super::*;
    use crate::config::RemoteWriteStrategy;
    use crate::identity::IdentitySource;
    use crate::notify::NotifyLevel;
    use crate::store::{
        CartItemRecord, CatalogProduct, LocalOp, MemoryCatalog, MemoryLocalStore,
        MemoryRemoteStore, RemoteOp,
    };

    const DEBOUNCE: Duration = Duration::from_millis(500);
    const PAST_DEBOUNCE: Duration = Duration::from_millis(600);

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<(NotifyLevel, String)>>,
    }

    impl RecordingNotifier {
        fn messages(&self) -> Vec<(NotifyLevel, String)> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, level: NotifyLevel, message: &str) {
            self.messages.lock().unwrap().push((level, message.to_string()));
        }
    }

    struct Harness {
        identity: IdentitySource,
        local: Arc<MemoryLocalStore>,
        remote: Arc<MemoryRemoteStore>,
        catalog: Arc<MemoryCatalog>,
        notifier: Arc<RecordingNotifier>,
    }

    impl Harness {
        fn new(initial: Identity) -> Self {
            Self::with_remote(initial, MemoryRemoteStore::new())
        }

        fn with_remote(initial: Identity, remote: MemoryRemoteStore) -> Self {
            Self {
                identity: IdentitySource::new(initial),
                local: Arc::new(MemoryLocalStore::new()),
                remote: Arc::new(remote),
                catalog: Arc::new(MemoryCatalog::new([
                    product("P1", 1000),
                    product("P2", 1500),
                ])),
                notifier: Arc::new(RecordingNotifier::default()),
            }
        }

        fn start(&self) -> CartEngine {
            self.start_with(config())
        }

        fn start_with(&self, config: SyncConfig) -> CartEngine {
            let collaborators = Collaborators {
                local: self.local.clone(),
                remote: self.remote.clone(),
                catalog: self.catalog.clone(),
                notifier: self.notifier.clone(),
            };
            CartEngine::start(config, collaborators, self.identity.subscribe())
        }

        fn local_lines(&self) -> Vec<CartLine> {
            let raw = self.local.value("cart").unwrap();
            serde_json::from_str(&raw).unwrap()
        }
    }

    fn config() -> SyncConfig {
        SyncConfig {
            authenticated_debounce: DEBOUNCE,
            anonymous_debounce: DEBOUNCE,
            catalog_cache_ttl: None,
            ..SyncConfig::default()
        }
    }

    fn product(id: &str, cents: i64) -> CatalogProduct {
        CatalogProduct {
            id: ProductId::new(id),
            name: format!("Part {id}"),
            brand: "Acme".to_string(),
            part_number: format!("PN-{id}"),
            price: Price::from_cents(cents).unwrap(),
            image: None,
            in_stock: true,
        }
    }

    fn input(id: &str, cents: i64) -> CartLineInput {
        product(id, cents).to_line_input()
    }

    fn upsert(user: &str, product_id: &str, quantity: u32) -> RemoteOp {
        RemoteOp::Upsert(CartItemRecord {
            user_id: UserId::new(user),
            product_id: ProductId::new(product_id),
            quantity,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_into_one_write_of_final_state() {
        let h = Harness::new(Identity::Anonymous);
        let engine = h.start();
        engine.wait_until_ready(&Identity::Anonymous).await.unwrap();

        engine.add(input("P1", 1000)).unwrap();
        engine.add(input("P1", 1000)).unwrap();
        engine.set_quantity("P1", 5).unwrap();
        tokio::time::sleep(PAST_DEBOUNCE).await;

        let journal = h.local.journal();
        assert_eq!(journal.len(), 1);
        assert!(matches!(&journal[0], LocalOp::Set { key, .. } if key == "cart"));
        let lines = h.local_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_is_trailing_edge() {
        let h = Harness::new(Identity::Anonymous);
        let engine = h.start();
        engine.wait_until_ready(&Identity::Anonymous).await.unwrap();

        engine.add(input("P1", 1000)).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        engine.add(input("P1", 1000)).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(h.local.journal().is_empty());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(h.local.journal().len(), 1);
        assert_eq!(h.local_lines()[0].quantity, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_switch_discards_pending_write() {
        let h = Harness::new(Identity::Anonymous);
        h.remote.seed(&UserId::new("U1"), &[("P2", 3)]);
        let engine = h.start();
        engine.wait_until_ready(&Identity::Anonymous).await.unwrap();

        engine.add(input("P1", 1000)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        h.identity.sign_in("U1");
        engine.wait_until_ready(&Identity::user("U1")).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(h.local.journal().is_empty());
        assert!(h.remote.journal().is_empty());
        let state = engine.state();
        assert_eq!(state.line_count(), 1);
        assert_eq!(state.line(&ProductId::new("P2")).unwrap().quantity, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_change_during_load_restarts_load() {
        let h = Harness::with_remote(
            Identity::Anonymous,
            MemoryRemoteStore::new().with_latency(Duration::from_secs(1)),
        );
        h.remote.seed(&UserId::new("U1"), &[("P1", 1)]);
        h.remote.seed(&UserId::new("U2"), &[("P2", 2)]);
        let engine = h.start();
        engine.wait_until_ready(&Identity::Anonymous).await.unwrap();

        h.identity.sign_in("U1");
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(engine.status().phase, SyncPhase::Loading);
        h.identity.sign_in("U2");
        engine.wait_until_ready(&Identity::user("U2")).await.unwrap();

        let state = engine.state();
        assert!(state.line(&ProductId::new("P1")).is_none());
        assert_eq!(state.line(&ProductId::new("P2")).unwrap().quantity, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_checkout_clear_empties_store_before_returning() {
        let h = Harness::new(Identity::user("U1"));
        h.remote.seed(&UserId::new("U1"), &[("P1", 2)]);
        let engine = h.start();
        engine.wait_until_ready(&Identity::user("U1")).await.unwrap();
        engine.add(input("P2", 1500)).unwrap();

        engine.checkout_clear().await.unwrap();

        assert!(h.remote.rows(&UserId::new("U1")).is_empty());
        assert!(engine.state().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(
            h.remote.journal(),
            vec![RemoteOp::DeleteByUser(UserId::new("U1"))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_checkout_clear_during_load_is_not_undone() {
        let h = Harness::with_remote(
            Identity::Anonymous,
            MemoryRemoteStore::new().with_latency(Duration::from_secs(1)),
        );
        h.remote.seed(&UserId::new("U1"), &[("P1", 2)]);
        let engine = h.start();
        engine.wait_until_ready(&Identity::Anonymous).await.unwrap();

        h.identity.sign_in("U1");
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.status().phase, SyncPhase::Loading);

        engine.checkout_clear().await.unwrap();
        assert!(engine.state().is_empty());
        assert!(h.remote.rows(&UserId::new("U1")).is_empty());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(engine.state().is_empty());
        assert!(h.remote.rows(&UserId::new("U1")).is_empty());
        assert_eq!(engine.status().phase, SyncPhase::Ready);
        assert!(
            !h.remote
                .journal()
                .iter()
                .any(|op| matches!(op, RemoteOp::Upsert(_)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_anonymous_cart_then_sign_in() {
        let h = Harness::new(Identity::Anonymous);
        let engine = h.start();
        engine.wait_until_ready(&Identity::Anonymous).await.unwrap();

        engine.add(input("P1", 1000)).unwrap();
        engine.add(input("P1", 1000)).unwrap();
        let state = engine.state();
        assert_eq!(state.line_count(), 1);
        assert_eq!(state.subtotal(), Decimal::new(2000, 2));
        assert_eq!(state.item_count(), 2);

        tokio::time::sleep(PAST_DEBOUNCE).await;
        let stored = h.local_lines();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].product_id().as_str(), "P1");
        assert_eq!(stored[0].quantity, 2);

        h.identity.sign_in("U1");
        engine.wait_until_ready(&Identity::user("U1")).await.unwrap();
        assert!(engine.state().is_empty());

        engine.add(input("P2", 1500)).unwrap();
        tokio::time::sleep(PAST_DEBOUNCE).await;
        assert_eq!(
            h.remote.rows(&UserId::new("U1")),
            vec![(ProductId::new("P2"), 1)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_notifies_without_rollback_or_retry() {
        let h = Harness::new(Identity::Anonymous);
        let engine = h.start();
        engine.wait_until_ready(&Identity::Anonymous).await.unwrap();
        h.local.fail_writes(true);

        engine.add(input("P1", 1000)).unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(
            h.notifier.messages(),
            vec![(NotifyLevel::Error, "Failed to sync cart".to_string())]
        );
        assert_eq!(engine.state().item_count(), 1);
        assert_eq!(engine.status().phase, SyncPhase::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_local_cart_is_reset() {
        let h = Harness::new(Identity::Anonymous);
        h.local.seed("cart", "{\"lines\": oops");
        let engine = h.start();
        engine.wait_until_ready(&Identity::Anonymous).await.unwrap();

        assert!(engine.state().is_empty());
        assert_eq!(h.local.value("cart"), None);
        let messages = h.notifier.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, NotifyLevel::Warning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_saved_is_not_notified() {
        let h = Harness::new(Identity::Anonymous);
        let engine = h.start();
        engine.wait_until_ready(&Identity::Anonymous).await.unwrap();

        assert!(engine.state().is_empty());
        assert!(h.notifier.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_failure_loads_empty_and_next_write_replaces() {
        let h = Harness::new(Identity::user("U1"));
        h.remote.seed(&UserId::new("U1"), &[("P1", 4)]);
        h.remote.fail_reads(true);
        let engine = h.start();
        engine.wait_until_ready(&Identity::user("U1")).await.unwrap();

        assert!(engine.state().is_empty());
        assert_eq!(
            h.notifier.messages(),
            vec![(NotifyLevel::Error, "Failed to load cart".to_string())]
        );

        engine.add(input("P2", 1500)).unwrap();
        tokio::time::sleep(PAST_DEBOUNCE).await;
        assert_eq!(
            h.remote.journal(),
            vec![
                RemoteOp::DeleteByUser(UserId::new("U1")),
                upsert("U1", "P2", 1),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_diff_writes_only_changed_rows() {
        let h = Harness::new(Identity::user("U1"));
        h.remote.seed(&UserId::new("U1"), &[("P1", 1), ("P2", 1)]);
        let engine = h.start();
        engine.wait_until_ready(&Identity::user("U1")).await.unwrap();

        engine.remove("P1").unwrap();
        engine.set_quantity("P2", 3).unwrap();
        tokio::time::sleep(PAST_DEBOUNCE).await;

        assert_eq!(
            h.remote.journal(),
            vec![
                RemoteOp::DeleteOne(UserId::new("U1"), ProductId::new("P1")),
                upsert("U1", "P2", 3),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_strategy_rewrites_cart() {
        let h = Harness::new(Identity::user("U1"));
        h.remote.seed(&UserId::new("U1"), &[("P1", 1)]);
        let engine = h.start_with(SyncConfig {
            remote_write: RemoteWriteStrategy::Replace,
            ..config()
        });
        engine.wait_until_ready(&Identity::user("U1")).await.unwrap();

        engine.add(input("P2", 1500)).unwrap();
        tokio::time::sleep(PAST_DEBOUNCE).await;

        assert_eq!(
            h.remote.journal(),
            vec![
                RemoteOp::DeleteByUser(UserId::new("U1")),
                upsert("U1", "P1", 1),
                upsert("U1", "P2", 1),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_returning_to_stored_state_skips_write() {
        let h = Harness::new(Identity::user("U1"));
        h.remote.seed(&UserId::new("U1"), &[("P1", 1)]);
        let engine = h.start();
        engine.wait_until_ready(&Identity::user("U1")).await.unwrap();

        engine.add(input("P1", 1000)).unwrap();
        engine.set_quantity("P1", 1).unwrap();
        tokio::time::sleep(PAST_DEBOUNCE).await;

        assert!(h.remote.journal().is_empty());
        assert_eq!(engine.status().phase, SyncPhase::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_action_schedules_nothing() {
        let h = Harness::new(Identity::Anonymous);
        let engine = h.start();
        engine.wait_until_ready(&Identity::Anonymous).await.unwrap();
        engine.add(input("P1", 1000)).unwrap();

        let result = engine.set_quantity("P1", -2);

        assert!(matches!(result, Err(CartError::NegativeQuantity { .. })));
        assert_eq!(engine.state().item_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_flushes_pending_write() {
        let h = Harness::new(Identity::Anonymous);
        let engine = h.start();
        engine.wait_until_ready(&Identity::Anonymous).await.unwrap();
        let handle = engine.handle();

        engine.add(input("P1", 1000)).unwrap();
        engine.shutdown().await;

        assert_eq!(h.local_lines().len(), 1);
        assert_eq!(handle.status().phase, SyncPhase::Stopped);
        assert!(matches!(
            handle.checkout_clear().await,
            Err(SyncError::EngineStopped)
        ));
        assert!(matches!(
            handle.wait_until_ready(&Identity::Anonymous).await,
            Err(SyncError::EngineStopped)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_catalog_cache_spares_repeat_lookups() {
        let h = Harness::new(Identity::user("U1"));
        h.remote.seed(&UserId::new("U1"), &[("P1", 1)]);
        let engine = h.start_with(SyncConfig {
            catalog_cache_ttl: Some(Duration::from_secs(60)),
            ..config()
        });
        engine.wait_until_ready(&Identity::user("U1")).await.unwrap();

        h.identity.sign_out();
        engine.wait_until_ready(&Identity::Anonymous).await.unwrap();
        h.identity.sign_in("U1");
        engine.wait_until_ready(&Identity::user("U1")).await.unwrap();

        assert_eq!(engine.state().line_count(), 1);
        assert_eq!(h.catalog.lookups(), 1);
    }

    #[test]
    fn test_status_serializes_for_ui() {
        let status = SyncStatus {
            phase: SyncPhase::PendingWrite,
            identity: Some(Identity::Anonymous),
            generation: 3,
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["phase"], "pending_write");
        assert_eq!(value["generation"], 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_tracks_phases() {
        let h = Harness::new(Identity::Anonymous);
        let engine = h.start();
        engine.wait_until_ready(&Identity::Anonymous).await.unwrap();
        assert_eq!(engine.status().phase, SyncPhase::Ready);

        engine.add(input("P1", 1000)).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(engine.status().phase, SyncPhase::PendingWrite);

        tokio::time::sleep(PAST_DEBOUNCE).await;
        let status = engine.status();
        assert_eq!(status.phase, SyncPhase::Ready);
        assert_eq!(status.identity, Some(Identity::Anonymous));
    }
}
