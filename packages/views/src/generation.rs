//! Request-generation tokens for discarding stale fetch results.
//!
//! Selection changes can overlap in-flight fetches. Nothing cancels a
//! fetch that is already out; instead every outgoing fetch is stamped
//! with a token, and a result whose token is no longer the latest
//! issued is thrown away on arrival. Latest-issued wins, regardless of
//! arrival order.

use std::sync::atomic::{AtomicU64, Ordering};

/// Stamp for one outgoing fetch. Compare with
/// [`RequestGeneration::is_current`] when the result arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

/// Monotonic token source. Each view owns one.
#[derive(Debug, Default)]
pub struct RequestGeneration {
    latest: AtomicU64,
}

impl RequestGeneration {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            latest: AtomicU64::new(0),
        }
    }

    /// Stamps a new fetch, invalidating every earlier token.
    pub fn issue(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether the token still names the latest issued fetch.
    #[must_use]
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_current() {
        let generation = RequestGeneration::new();
        let token = generation.issue();
        assert!(generation.is_current(token));
    }

    #[test]
    fn reissue_invalidates_earlier_tokens() {
        let generation = RequestGeneration::new();
        let first = generation.issue();
        let second = generation.issue();

        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));
    }

    #[test]
    fn tokens_from_different_generations_are_independent() {
        let left = RequestGeneration::new();
        let right = RequestGeneration::new();
        let left_token = left.issue();

        right.issue();
        right.issue();

        assert!(left.is_current(left_token));
    }
}
