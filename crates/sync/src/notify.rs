//! User-facing notifications for sync failures.
//!
//! The engine reports load and write failures through a [`Notifier`] and keeps
//! going; how the message reaches the user (toast, banner, log line) is up to
//! the host application.

use tracing::{error, info, warn};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyLevel {
    Info,
    Warning,
    Error,
}

/// Fire-and-forget sink for user-facing messages.
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NotifyLevel, message: &str);
}

/// Notifier that logs through `tracing`.
///
/// Each notification is emitted once at its level. Whether it becomes a Sentry
/// event or a breadcrumb is decided by the subscriber's Sentry layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        match level {
            NotifyLevel::Info => info!(category = "cart", "{message}"),
            NotifyLevel::Warning => warn!(category = "cart", "{message}"),
            NotifyLevel::Error => error!(category = "cart", "{message}"),
        }
    }
}
