//! # Outbox Service
//!
//! Thread-safe outbox shared by every producer on a node and drained by the
//! node's single publisher task.
//!
//! ## Concurrency
//!
//! - `enqueue` may be called from any task or thread.
//! - `drain`, `confirm`, `requeue` and `persist` are only called by the
//!   publisher.
//! - Every mutation and every snapshot save happens under one mutex, so
//!   saves are applied in mutation order.

use parking_lot::Mutex;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tracing::{debug, error, warn};

use shared_types::SyncEvent;

use crate::config::OutboxConfig;
use crate::domain::{OutboxEntry, OutboxError, OutboxQueue};
use crate::ports::SnapshotStore;

/// Durable outbound event queue.
pub struct Outbox {
    queue: Mutex<OutboxQueue>,
    store: Box<dyn SnapshotStore>,
    /// Wakes the publisher when something is enqueued.
    wake: Notify,
}

impl Outbox {
    /// Open the outbox, restoring whatever `store` last persisted.
    pub fn open(config: OutboxConfig, store: impl SnapshotStore + 'static) -> Result<Self, OutboxError> {
        let entries = store.load()?;
        if entries.len() > config.capacity {
            warn!(
                restored = entries.len(),
                capacity = config.capacity,
                "[outbox] Restored snapshot exceeds capacity; enqueue blocked until drained"
            );
        } else if !entries.is_empty() {
            debug!(restored = entries.len(), "[outbox] Resuming pending entries");
        }

        Ok(Self {
            queue: Mutex::new(OutboxQueue::restore(config.capacity, entries)),
            store: Box::new(store),
            wake: Notify::new(),
        })
    }

    /// Append `event` and persist the queue before returning its sequence.
    ///
    /// # Errors
    ///
    /// - `QueueSaturated` when capacity is reached.
    /// - `Persistence` when the snapshot cannot be saved; the event is not
    ///   kept in that case.
    pub fn enqueue(&self, event: SyncEvent) -> Result<u64, OutboxError> {
        let kind = event.kind();
        let sequence = {
            let mut queue = self.queue.lock();
            let sequence = match queue.push(event) {
                Ok(sequence) => sequence,
                Err(e) => {
                    error!(kind = %kind, pending = queue.len(), "[outbox] Queue saturated; transport may be down");
                    return Err(e);
                }
            };
            if let Err(e) = self.store.save(&queue.snapshot()) {
                queue.remove(sequence);
                error!(kind = %kind, error = %e, "[outbox] Enqueue rolled back; snapshot not saved");
                return Err(e);
            }
            sequence
        };

        debug!(kind = %kind, sequence, "[outbox] Event enqueued");
        self.wake.notify_one();
        Ok(sequence)
    }

    /// Lazy FIFO pass over the entries pending right now.
    ///
    /// Entries appended after the drain was opened (including requeued ones)
    /// are left for the next pass. Opening a new drain restarts from the
    /// head.
    pub fn drain(&self) -> Drain<'_> {
        let ceiling = self.queue.lock().next_sequence();
        Drain {
            outbox: self,
            cursor: 0,
            ceiling,
        }
    }

    /// Remove an entry after successful hand-off to the transport.
    pub fn confirm(&self, sequence: u64) -> bool {
        self.queue.lock().remove(sequence).is_some()
    }

    /// Move a failed entry to the tail. Returns its new sequence.
    pub fn requeue(&self, entry: &OutboxEntry) -> Option<u64> {
        self.queue.lock().requeue(entry.sequence)
    }

    /// Save the current queue to stable storage.
    pub fn persist(&self) -> Result<(), OutboxError> {
        let queue = self.queue.lock();
        self.store.save(&queue.snapshot())
    }

    /// Future that completes at the next enqueue (or immediately if one
    /// happened since the last wait).
    pub fn notified(&self) -> Notified<'_> {
        self.wake.notified()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.lock().capacity()
    }

    /// Copy of the pending entries, in order.
    pub fn snapshot(&self) -> Vec<OutboxEntry> {
        self.queue.lock().snapshot()
    }
}

/// Iterator returned by [`Outbox::drain`].
pub struct Drain<'a> {
    outbox: &'a Outbox,
    /// Last sequence yielded.
    cursor: u64,
    /// First sequence not visible to this pass.
    ceiling: u64,
}

impl Iterator for Drain<'_> {
    type Item = OutboxEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let queue = self.outbox.queue.lock();
        let entry = queue.next_between(self.cursor, self.ceiling)?.clone();
        self.cursor = entry.sequence;
        Some(entry)
    }
}
