//! # Anti-Entropy Configuration

use std::time::Duration;

/// Default lifetime of an unanswered backfill request.
pub const DEFAULT_BACKFILL_TTL: Duration = Duration::from_secs(5 * 60);

/// Reconciler configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AntiEntropyConfig {
    /// After this long without a response, another request may be sent.
    pub backfill_ttl: Duration,
}

impl Default for AntiEntropyConfig {
    fn default() -> Self {
        Self {
            backfill_ttl: DEFAULT_BACKFILL_TTL,
        }
    }
}

impl AntiEntropyConfig {
    /// Short expiry for tests.
    pub fn for_testing() -> Self {
        Self {
            backfill_ttl: Duration::from_millis(200),
        }
    }
}
