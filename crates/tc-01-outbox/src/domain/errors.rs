//! # Domain Errors
//!
//! Error types for the outbox.

use std::path::PathBuf;

use thiserror::Error;

/// Outbox error types.
#[derive(Debug, Error)]
pub enum OutboxError {
    /// Capacity reached. Signals sustained transport unavailability; must be
    /// surfaced to the operator.
    #[error("Outbox saturated: {capacity} entries pending")]
    QueueSaturated {
        /// Configured capacity
        capacity: usize,
    },

    /// Writing the snapshot to stable storage failed.
    #[error("Outbox persistence failed: {0}")]
    Persistence(String),

    /// The persisted snapshot could not be read back.
    #[error("Outbox snapshot corrupt: {0}")]
    Corrupt(String),

    /// Another process holds the outbox directory.
    #[error("Outbox already in use ({})", path.display())]
    Locked {
        /// Lock file path
        path: PathBuf,
    },
}

impl From<std::io::Error> for OutboxError {
    fn from(e: std::io::Error) -> Self {
        OutboxError::Persistence(e.to_string())
    }
}
