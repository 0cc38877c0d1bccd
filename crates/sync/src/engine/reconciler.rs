//! The reconciliation task.
//!
//! One task owns every store interaction. It reacts to four inputs, in this
//! priority order: commands from handles, identity changes, cart state
//! changes and the debounce deadline. Because store I/O is awaited inline, a
//! write in flight always completes before the next identity change is seen.

use std::sync::Arc;

use partcart_core::{CartLine, CartState, Identity};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use super::cell::CartCell;
use super::persistence::{LoadOutcome, Persistence};
use super::{Command, SyncPhase, SyncStatus};
use crate::config::SyncConfig;
use crate::error::StoreError;
use crate::notify::{Notifier, NotifyLevel};

const LOAD_FAILED: &str = "Failed to load cart";
const LOCAL_CART_RESET: &str = "Your saved cart could not be read and has been reset";
const WRITE_FAILED: &str = "Failed to sync cart";
const CLEAR_FAILED: &str = "Failed to clear cart";

#[derive(Debug, Clone, Copy)]
struct PendingWrite {
    deadline: Instant,
    generation: u64,
}

pub(super) struct Reconciler {
    config: SyncConfig,
    persistence: Persistence,
    notifier: Arc<dyn Notifier>,
    cell: Arc<CartCell>,
    state_rx: watch::Receiver<CartState>,
    identity_rx: watch::Receiver<Identity>,
    identity_open: bool,
    commands: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<SyncStatus>,
    identity: Identity,
    generation: u64,
    /// Lines last loaded from or persisted to the store; `None` when unknown.
    baseline: Option<Vec<CartLine>>,
    pending: Option<PendingWrite>,
}

impl Reconciler {
    pub(super) fn new(
        config: SyncConfig,
        persistence: Persistence,
        notifier: Arc<dyn Notifier>,
        cell: Arc<CartCell>,
        identity_rx: watch::Receiver<Identity>,
        commands: mpsc::UnboundedReceiver<Command>,
        status: watch::Sender<SyncStatus>,
    ) -> Self {
        let state_rx = cell.subscribe();
        Self {
            config,
            persistence,
            notifier,
            cell,
            state_rx,
            identity_rx,
            identity_open: true,
            commands,
            status,
            identity: Identity::Anonymous,
            generation: 0,
            baseline: None,
            pending: None,
        }
    }

    pub(super) async fn run(mut self) {
        self.identity = self.identity_rx.borrow_and_update().clone();
        self.generation = 1;
        info!(identity = %self.identity, "Cart sync started");
        self.load().await;

        loop {
            let deadline = self.pending.map(|pending| pending.deadline);

            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(Command::CheckoutClear(reply)) => self.checkout_clear(reply).await,
                    Some(Command::Shutdown) | None => break,
                },

                changed = self.identity_rx.changed(), if self.identity_open => {
                    if changed.is_err() {
                        debug!("Identity source closed; keeping current identity");
                        self.identity_open = false;
                        continue;
                    }
                    let next = self.identity_rx.borrow_and_update().clone();
                    if next != self.identity {
                        self.switch_identity(next).await;
                    }
                },

                changed = self.state_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.on_state_change();
                },

                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.flush().await;
                },
            }
        }

        self.stop().await;
    }

    async fn switch_identity(&mut self, identity: Identity) {
        self.generation += 1;
        if self.pending.take().is_some() {
            debug!(previous = %self.identity, "Discarded pending write for previous identity");
        }
        info!(from = %self.identity, to = %identity, generation = self.generation, "Identity changed");
        self.identity = identity;
        self.load().await;
    }

    /// Load the cart for the current identity, restarting if the identity
    /// changes while the fetch is in flight.
    async fn load(&mut self) {
        let clears_before = self.cell.checkout_clears();
        let outcome = loop {
            self.publish(SyncPhase::Loading);
            let identity = self.identity.clone();

            tokio::select! {
                biased;

                changed = self.identity_rx.changed(), if self.identity_open => {
                    if changed.is_err() {
                        self.identity_open = false;
                        continue;
                    }
                    let next = self.identity_rx.borrow_and_update().clone();
                    if next != identity {
                        self.generation += 1;
                        debug!(to = %next, generation = self.generation, "Identity changed during load; restarting");
                        self.identity = next;
                    }
                },

                outcome = self.persistence.load(&identity) => break outcome,
            }
        };

        let (lines, baseline_known) = match outcome {
            LoadOutcome::Loaded(lines) => {
                debug!(identity = %self.identity, lines = lines.len(), "Loaded cart");
                (lines, true)
            }
            LoadOutcome::Empty => {
                debug!(identity = %self.identity, "No saved cart");
                (Vec::new(), true)
            }
            LoadOutcome::Failed(e) => {
                warn!(identity = %self.identity, error = %e, "Failed to load cart");
                self.notifier.notify(NotifyLevel::Error, LOAD_FAILED);
                (Vec::new(), false)
            }
            LoadOutcome::Unreadable(e) => {
                warn!(identity = %self.identity, error = %e, "Saved local cart is unreadable");
                self.notifier.notify(NotifyLevel::Warning, LOCAL_CART_RESET);
                (Vec::new(), true)
            }
        };

        let loaded_state = CartState::from_lines(lines);
        let loaded = loaded_state.lines().to_vec();
        self.baseline = baseline_known.then(|| loaded.clone());
        if !self.cell.load(loaded_state, clears_before) {
            debug!(identity = %self.identity, "Checkout clear landed during load; keeping the cleared cart");
        }

        // A dispatch may have landed between the LOAD and this point.
        let raced = self.state_rx.borrow_and_update().lines() != loaded.as_slice();
        if raced {
            self.schedule_write();
        } else {
            self.publish(SyncPhase::Ready);
        }
    }

    fn on_state_change(&mut self) {
        let at_baseline = {
            let state = self.state_rx.borrow_and_update();
            self.baseline.as_deref() == Some(state.lines())
        };

        if at_baseline {
            if self.pending.take().is_some() {
                debug!("Cart returned to its stored state; pending write cancelled");
            }
            self.publish(SyncPhase::Ready);
        } else {
            self.schedule_write();
        }
    }

    fn schedule_write(&mut self) {
        let debounce = self.config.debounce_for(&self.identity);
        self.pending = Some(PendingWrite {
            deadline: Instant::now() + debounce,
            generation: self.generation,
        });
        self.publish(SyncPhase::PendingWrite);
    }

    async fn flush(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if pending.generation != self.generation {
            debug!(
                scheduled = pending.generation,
                current = self.generation,
                "Discarded stale write"
            );
            self.publish(SyncPhase::Ready);
            return;
        }

        self.publish(SyncPhase::Writing);
        let snapshot = self.state_rx.borrow_and_update().clone();

        match self
            .persistence
            .write(&self.identity, snapshot.lines(), self.baseline.as_deref())
            .await
        {
            Ok(()) => {
                debug!(
                    identity = %self.identity,
                    lines = snapshot.line_count(),
                    items = snapshot.item_count(),
                    "Persisted cart"
                );
                self.baseline = Some(snapshot.into_lines());
            }
            Err(e) => {
                warn!(identity = %self.identity, error = %e, "Failed to persist cart");
                self.notifier.notify(NotifyLevel::Error, WRITE_FAILED);
                // The store may hold a partial write.
                self.baseline = None;
            }
        }

        self.publish(SyncPhase::Ready);
    }

    async fn checkout_clear(&mut self, reply: oneshot::Sender<Result<(), StoreError>>) {
        self.generation += 1;
        if self.pending.take().is_some() {
            debug!("Checkout clear superseded pending write");
        }
        self.publish(SyncPhase::Writing);

        let result = self.persistence.clear(&self.identity).await;
        match &result {
            Ok(()) => {
                info!(identity = %self.identity, "Cleared cart after checkout");
                self.baseline = Some(Vec::new());
            }
            Err(e) => {
                warn!(identity = %self.identity, error = %e, "Failed to clear stored cart");
                self.notifier.notify(NotifyLevel::Error, CLEAR_FAILED);
                self.baseline = None;
            }
        }

        // Mutations dispatched after the clear still need persisting.
        let raced = !self.state_rx.borrow_and_update().is_empty();
        if raced {
            self.schedule_write();
        } else {
            self.publish(SyncPhase::Ready);
        }

        // The caller may have stopped waiting.
        let _ = reply.send(result);
    }

    async fn stop(&mut self) {
        // Shutdown can win the race against a change the loop has not seen.
        if self.state_rx.has_changed().unwrap_or(false) {
            self.on_state_change();
        }
        if self.pending.is_some() {
            debug!("Flushing pending write before shutdown");
            self.flush().await;
        }
        self.publish(SyncPhase::Stopped);
        info!(identity = %self.identity, "Cart sync stopped");
    }

    fn publish(&self, phase: SyncPhase) {
        let next = SyncStatus {
            phase,
            identity: Some(self.identity.clone()),
            generation: self.generation,
        };
        self.status.send_if_modified(|status| {
            if *status == next {
                false
            } else {
                *status = next;
                true
            }
        });
    }
}
