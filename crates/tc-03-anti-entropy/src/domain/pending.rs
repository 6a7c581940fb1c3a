//! # Outstanding Backfill Requests
//!
//! Time-bounded set of badges this node has asked a peer for. Every peer
//! announces every badge it holds, so without the set one missing badge
//! would trigger a request per announcement.
//!
//! - A mark expires after the configured lifetime; a lost request or
//!   response is retried on the next announcement after that.
//! - Expired marks are garbage-collected on every `try_mark`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use shared_types::BadgeNumber;

/// Badges with a backfill request in flight.
#[derive(Debug)]
pub struct PendingBackfills {
    /// Badge -> when the request was sent.
    requested: HashMap<BadgeNumber, Instant>,
    ttl: Duration,
}

impl PendingBackfills {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            requested: HashMap::new(),
            ttl,
        }
    }

    /// Mark `badge` as requested at `now`.
    ///
    /// Returns `false` if an unexpired request is already outstanding.
    pub fn try_mark(&mut self, badge: &str, now: Instant) -> bool {
        self.collect_garbage(now);
        if self.requested.contains_key(badge) {
            return false;
        }
        self.requested.insert(badge.to_string(), now);
        true
    }

    /// Forget the request for `badge`. Returns whether one was outstanding.
    pub fn clear(&mut self, badge: &str) -> bool {
        self.requested.remove(badge).is_some()
    }

    pub fn is_pending(&self, badge: &str, now: Instant) -> bool {
        self.requested
            .get(badge)
            .is_some_and(|sent| now.saturating_duration_since(*sent) < self.ttl)
    }

    pub fn len(&self) -> usize {
        self.requested.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requested.is_empty()
    }

    fn collect_garbage(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.requested
            .retain(|_, sent| now.saturating_duration_since(*sent) < ttl);
    }
}
