//! # Outbox Entry

use serde::{Deserialize, Serialize};
use shared_types::SyncEvent;

/// An event waiting for transport hand-off.
///
/// `sequence` orders entries within this node only; it is never sent to
/// peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub sequence: u64,
    pub event: SyncEvent,
}

impl OutboxEntry {
    pub fn new(sequence: u64, event: SyncEvent) -> Self {
        Self { sequence, event }
    }
}
