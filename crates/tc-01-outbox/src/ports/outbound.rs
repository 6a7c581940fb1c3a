//! # Outbound Ports
//!
//! Stable storage for the outbox snapshot.

use crate::domain::{OutboxEntry, OutboxError};

/// Stable storage for the full pending queue.
///
/// `save` replaces the previous snapshot as a whole; a reader must never
/// observe a partially written one.
pub trait SnapshotStore: Send + Sync {
    /// Read the last saved snapshot; empty when nothing was ever saved.
    fn load(&self) -> Result<Vec<OutboxEntry>, OutboxError>;

    /// Overwrite the snapshot with `entries`, in order.
    fn save(&self, entries: &[OutboxEntry]) -> Result<(), OutboxError>;
}
