#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared neighborhood-filter selection state.
//!
//! Single source of truth for the active neighborhood filter, shared
//! across every dependent dashboard view without prop-drilling. A
//! [`store::SelectionProvider`] owns the state for the page's lifetime;
//! construction yields exactly one [`store::FilterControl`] (the single
//! writer), while any number of cloned [`store::SelectionStore`] handles
//! read the value and receive synchronous change notifications.

pub mod store;

use std::fmt;

use thiserror::Error;

/// String value representing the unfiltered state.
pub const ALL_SENTINEL: &str = "all";

/// The currently selected neighborhood scope.
///
/// Defaults to [`All`](Self::All) at session start and is mutated only by
/// an explicit user selection. Never persisted beyond the page's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum NeighborhoodFilter {
    /// No filter; statistics cover every neighborhood.
    #[default]
    All,
    /// Statistics scoped to a single named neighborhood.
    Named(String),
}

impl NeighborhoodFilter {
    /// Creates a filter from a raw selection string.
    ///
    /// Empty strings and the `"all"` sentinel (case-insensitive) collapse
    /// to [`All`](Self::All), so a `Named` value always carries a real
    /// neighborhood name.
    #[must_use]
    pub fn named(name: &str) -> Self {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_SENTINEL) {
            Self::All
        } else {
            Self::Named(trimmed.to_owned())
        }
    }

    /// Returns `true` when a specific neighborhood is selected.
    #[must_use]
    pub const fn is_filtered(&self) -> bool {
        matches!(self, Self::Named(_))
    }

    /// Returns the neighborhood name, or `None` for the unfiltered state.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Named(name) => Some(name),
        }
    }
}

impl fmt::Display for NeighborhoodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "{ALL_SENTINEL}"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

impl From<&str> for NeighborhoodFilter {
    fn from(value: &str) -> Self {
        Self::named(value)
    }
}

/// Errors from selection-store operations.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// A handle was used after its provider was dropped.
    #[error("store accessed without provider")]
    ProviderMissing,
}
