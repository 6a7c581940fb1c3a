//! Domain layer: outstanding backfill tracking and errors.

pub mod errors;
pub mod pending;

pub use errors::AntiEntropyError;
pub use pending::PendingBackfills;
