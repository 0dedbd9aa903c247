//! Provider-owned selection state with synchronous subscriber fan-out.
//!
//! The [`SelectionProvider`] owns the shared state for the lifetime of a
//! page/session. Constructing it yields exactly one [`FilterControl`],
//! the only writer. Read handles and the control hold weak references;
//! once the provider is dropped, every operation fails with
//! [`SelectionError::ProviderMissing`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::{NeighborhoodFilter, SelectionError};

/// Callback invoked with the new value on every selection change.
type Callback = Box<dyn Fn(&NeighborhoodFilter) + Send + Sync>;

/// Identifier returned by [`SelectionStore::subscribe`]; pass it to
/// [`SelectionStore::unsubscribe`] to stop receiving notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// State behind the provider: the current value plus the subscriber list.
struct Shared {
    selected: RwLock<NeighborhoodFilter>,
    subscribers: RwLock<Vec<(SubscriptionId, Callback)>>,
    next_subscription: AtomicU64,
}

/// Owns the selection state; everything else holds weak handles into it.
///
/// Create one per page mount and keep it alive for as long as dependent
/// views exist. Dropping the provider invalidates every handle.
pub struct SelectionProvider {
    shared: Arc<Shared>,
}

impl SelectionProvider {
    /// Creates a provider with the default (unfiltered) selection and
    /// returns it together with the one writer handle.
    #[must_use]
    pub fn new() -> (Self, FilterControl) {
        let shared = Arc::new(Shared {
            selected: RwLock::new(NeighborhoodFilter::All),
            subscribers: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
        });
        let control = FilterControl {
            shared: Arc::downgrade(&shared),
        };
        (Self { shared }, control)
    }

    /// Returns a read handle onto the selection state.
    #[must_use]
    pub fn store(&self) -> SelectionStore {
        SelectionStore {
            shared: Arc::downgrade(&self.shared),
        }
    }
}

/// The single writer handle for the selection. Not `Clone`; the
/// filter-control component owns it alone.
pub struct FilterControl {
    shared: Weak<Shared>,
}

impl FilterControl {
    /// Replaces the selection and notifies every subscriber synchronously
    /// before returning.
    ///
    /// Subscribers run even when the new value equals the old one;
    /// suppressing redundant re-renders is the rendering layer's concern.
    /// Callbacks must not subscribe, unsubscribe, or change the selection
    /// themselves; the subscriber list stays read-locked for the duration
    /// of the fan-out.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::ProviderMissing`] if the provider has
    /// been dropped.
    pub fn set_selected(&self, value: NeighborhoodFilter) -> Result<(), SelectionError> {
        let shared = self
            .shared
            .upgrade()
            .ok_or(SelectionError::ProviderMissing)?;

        let current = {
            let mut selected = shared
                .selected
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *selected = value;
            selected.clone()
        };

        let subscribers = shared
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        for (_, callback) in subscribers.iter() {
            callback(&current);
        }

        Ok(())
    }
}

/// Read handle onto the selection state. Cheap to clone; hand one to each
/// dependent view.
#[derive(Clone)]
pub struct SelectionStore {
    shared: Weak<Shared>,
}

impl SelectionStore {
    /// Returns the current selection.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::ProviderMissing`] if the provider has
    /// been dropped.
    pub fn selected(&self) -> Result<NeighborhoodFilter, SelectionError> {
        let shared = self
            .shared
            .upgrade()
            .ok_or(SelectionError::ProviderMissing)?;
        let selected = shared
            .selected
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(selected.clone())
    }

    /// Returns `true` when a specific neighborhood is selected.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::ProviderMissing`] if the provider has
    /// been dropped.
    pub fn is_filtered(&self) -> Result<bool, SelectionError> {
        Ok(self.selected()?.is_filtered())
    }

    /// Registers a callback invoked synchronously on every selection
    /// change. Callbacks must not call back into the store to subscribe,
    /// unsubscribe, or write.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::ProviderMissing`] if the provider has
    /// been dropped.
    pub fn subscribe(
        &self,
        callback: impl Fn(&NeighborhoodFilter) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, SelectionError> {
        let shared = self
            .shared
            .upgrade()
            .ok_or(SelectionError::ProviderMissing)?;

        let id = SubscriptionId(shared.next_subscription.fetch_add(1, Ordering::Relaxed));
        shared
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Box::new(callback)));
        Ok(id)
    }

    /// Removes a previously registered callback. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::ProviderMissing`] if the provider has
    /// been dropped.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<(), SelectionError> {
        let shared = self
            .shared
            .upgrade()
            .ok_or(SelectionError::ProviderMissing)?;
        shared
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(existing, _)| *existing != id);
        Ok(())
    }
}
