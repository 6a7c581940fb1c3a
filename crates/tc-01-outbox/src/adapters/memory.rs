//! # In-Memory Snapshot Store
//!
//! Keeps the snapshot in shared memory. Clones share state, so a test can
//! drop an `Outbox` and reopen a new one from a clone to simulate a restart.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::{OutboxEntry, OutboxError};
use crate::ports::SnapshotStore;

/// Shared in-memory snapshot with save-failure injection.
#[derive(Clone, Default)]
pub struct InMemorySnapshotStore {
    saved: Arc<Mutex<Vec<OutboxEntry>>>,
    fail_saves: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `save` fail (`true`) or succeed (`false`).
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Last saved snapshot.
    pub fn saved(&self) -> Vec<OutboxEntry> {
        self.saved.lock().clone()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn load(&self) -> Result<Vec<OutboxEntry>, OutboxError> {
        Ok(self.saved.lock().clone())
    }

    fn save(&self, entries: &[OutboxEntry]) -> Result<(), OutboxError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(OutboxError::Persistence("injected save failure".into()));
        }
        *self.saved.lock() = entries.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
