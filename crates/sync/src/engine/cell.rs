//! The cart state container.

use std::sync::atomic::{AtomicU64, Ordering};

use partcart_core::{CartAction, CartError, CartState, reduce};
use tokio::sync::watch;

/// Owns the current `CartState` and publishes every change.
///
/// Each action runs the reducer while holding the channel's write lock, so two
/// dispatches never interleave and subscribers only ever observe complete
/// states.
#[derive(Debug)]
pub(crate) struct CartCell {
    sender: watch::Sender<CartState>,
    /// Bumped under the channel lock by every checkout clear.
    checkout_clears: AtomicU64,
}

impl CartCell {
    pub(crate) fn new() -> Self {
        let (sender, _) = watch::channel(CartState::empty());
        Self {
            sender,
            checkout_clears: AtomicU64::new(0),
        }
    }

    /// Number of checkout clears applied so far.
    pub(crate) fn checkout_clears(&self) -> u64 {
        self.checkout_clears.load(Ordering::Acquire)
    }

    /// Copy of the current state.
    pub(crate) fn snapshot(&self) -> CartState {
        self.sender.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<CartState> {
        self.sender.subscribe()
    }

    /// Apply `action`. Returns whether the state changed; subscribers are only
    /// woken when it did.
    pub(crate) fn apply(&self, action: &CartAction) -> Result<bool, CartError> {
        let mut outcome = Ok(false);
        self.sender.send_if_modified(|state| match reduce(state, action) {
            Ok(next) => {
                let changed = next != *state;
                if changed {
                    *state = next;
                }
                outcome = Ok(changed);
                changed
            }
            Err(e) => {
                outcome = Err(e);
                false
            }
        });
        outcome
    }

    /// Empty the cart for a checkout. A load that started before this call
    /// will not be applied over it.
    pub(crate) fn checkout_clear(&self) {
        self.sender.send_if_modified(|state| {
            self.checkout_clears.fetch_add(1, Ordering::AcqRel);
            if state.is_empty() {
                false
            } else {
                *state = CartState::empty();
                true
            }
        });
    }

    /// Replace the cart with `loaded` unless a checkout clear happened after
    /// `since` was read from [`CartCell::checkout_clears`]. Returns whether
    /// the load was applied.
    pub(crate) fn load(&self, loaded: CartState, since: u64) -> bool {
        let mut applied = false;
        self.sender.send_if_modified(|state| {
            if self.checkout_clears.load(Ordering::Acquire) != since {
                return false;
            }
            applied = true;
            if *state == loaded {
                false
            } else {
                *state = loaded;
                true
            }
        });
        applied
    }
}
