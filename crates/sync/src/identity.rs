//! Session identity source.
//!
//! The identity provider is external to the engine. [`IdentitySource`] adapts
//! its sign-in/sign-out events into a `watch` channel the engine subscribes to.
//! Only actual changes of identity are published; a token refresh for the same
//! user does not wake subscribers.

use partcart_core::{Identity, UserId};
use tokio::sync::watch;
use tracing::info;

/// Transition events emitted by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    SignedIn(UserId),
    SignedOut,
    /// Session token refreshed; identity may or may not have changed.
    Refreshed(Identity),
}

/// Publishes the current identity to cart engines.
#[derive(Debug)]
pub struct IdentitySource {
    sender: watch::Sender<Identity>,
}

impl IdentitySource {
    /// Create a source starting at `initial`.
    #[must_use]
    pub fn new(initial: Identity) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Create a source for a signed-out session.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(Identity::Anonymous)
    }

    /// Current identity.
    #[must_use]
    pub fn current(&self) -> Identity {
        self.sender.borrow().clone()
    }

    /// Subscribe to identity changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Identity> {
        self.sender.subscribe()
    }

    /// Apply a provider event. Returns whether the identity changed.
    pub fn apply(&self, event: IdentityEvent) -> bool {
        let next = match event {
            IdentityEvent::SignedIn(user) => Identity::Authenticated(user),
            IdentityEvent::SignedOut => Identity::Anonymous,
            IdentityEvent::Refreshed(identity) => identity,
        };
        let changed = self.sender.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next.clone();
            true
        });
        if changed {
            info!(identity = %next, "Identity changed");
        }
        changed
    }

    /// Sign in as `user`.
    pub fn sign_in(&self, user: impl Into<UserId>) -> bool {
        self.apply(IdentityEvent::SignedIn(user.into()))
    }

    /// Sign out.
    pub fn sign_out(&self) -> bool {
        self.apply(IdentityEvent::SignedOut)
    }
}
