//! # Outbox Domain
//!
//! Pure queue logic; no locking, no I/O.

pub mod entry;
pub mod errors;
pub mod queue;

pub use entry::OutboxEntry;
pub use errors::OutboxError;
pub use queue::OutboxQueue;
