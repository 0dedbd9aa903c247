//! Transient user-facing notifications.
//!
//! Defines a [`Notifier`] trait that decouples toast-style messages
//! from any rendering backend. Views report each failed fetch through
//! it exactly once; successful merges stay silent.

use std::sync::Arc;

/// Trait for surfacing transient notifications to the user.
///
/// Implementations must be `Send + Sync` so views can share one
/// notifier across async fetches.
pub trait Notifier: Send + Sync {
    /// Report a failure the user should see.
    fn notify_error(&self, message: &str);
}

/// Routes notifications to the `log` facade, for headless hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_error(&self, message: &str) {
        log::error!("{message}");
    }
}

/// A no-op implementation of [`Notifier`] that discards all messages.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify_error(&self, _message: &str) {}
}

/// Returns a shared [`NullNotifier`] instance for convenient use.
#[must_use]
pub fn null_notifier() -> Arc<dyn Notifier> {
    Arc::new(NullNotifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provided_notifiers_are_shareable_trait_objects() {
        let notifiers: Vec<Arc<dyn Notifier>> = vec![Arc::new(LogNotifier), null_notifier()];
        for notifier in &notifiers {
            notifier.notify_error("Failed to refresh statistics");
        }
    }
}
