//! # Outbox Queue
//!
//! Bounded FIFO of `OutboxEntry`, ordered by sequence.
//!
//! ## Algorithm: Tail Requeue
//!
//! A failed entry is removed from its position and appended again under a
//! fresh sequence. Sequences only grow, so a requeued entry always sorts
//! after every entry that was still pending when it failed: one stuck event
//! cannot block the entries behind it, and it never jumps ahead of older
//! ones.

use std::collections::VecDeque;

use shared_types::SyncEvent;

use super::entry::OutboxEntry;
use super::errors::OutboxError;

/// Bounded, sequence-ordered queue.
#[derive(Debug, Clone)]
pub struct OutboxQueue {
    entries: VecDeque<OutboxEntry>,
    next_sequence: u64,
    capacity: usize,
}

impl OutboxQueue {
    /// Empty queue; sequences start at 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            next_sequence: 1,
            capacity,
        }
    }

    /// Rebuild from a persisted snapshot.
    ///
    /// Entries are re-sorted by sequence. A snapshot larger than `capacity`
    /// is kept whole; `push` stays saturated until it drains below capacity.
    pub fn restore(capacity: usize, mut entries: Vec<OutboxEntry>) -> Self {
        entries.sort_by_key(|e| e.sequence);
        let next_sequence = entries.last().map_or(1, |e| e.sequence + 1);
        Self {
            entries: entries.into(),
            next_sequence,
            capacity,
        }
    }

    /// Append `event` at the tail.
    pub fn push(&mut self, event: SyncEvent) -> Result<u64, OutboxError> {
        if self.is_saturated() {
            return Err(OutboxError::QueueSaturated {
                capacity: self.capacity,
            });
        }
        let sequence = self.take_sequence();
        self.entries.push_back(OutboxEntry::new(sequence, event));
        Ok(sequence)
    }

    /// Remove the entry with `sequence`, if still pending.
    pub fn remove(&mut self, sequence: u64) -> Option<OutboxEntry> {
        let index = self.position(sequence)?;
        self.entries.remove(index)
    }

    /// Move the entry with `sequence` to the tail under a fresh sequence.
    ///
    /// Never fails on capacity: the entry is already counted.
    pub fn requeue(&mut self, sequence: u64) -> Option<u64> {
        let entry = self.remove(sequence)?;
        let fresh = self.take_sequence();
        self.entries.push_back(OutboxEntry::new(fresh, entry.event));
        Some(fresh)
    }

    /// Oldest pending entry with `after < sequence < before`.
    pub fn next_between(&self, after: u64, before: u64) -> Option<&OutboxEntry> {
        self.entries
            .iter()
            .find(|e| e.sequence > after && e.sequence < before)
    }

    /// Sequence the next push or requeue will receive.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn snapshot(&self) -> Vec<OutboxEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_saturated(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    fn position(&self, sequence: u64) -> Option<usize> {
        self.entries.iter().position(|e| e.sequence == sequence)
    }

    fn take_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }
}
