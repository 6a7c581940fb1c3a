//! Error types for anti-entropy reconciliation.

use shared_bus::BackfillChannelError;
use shared_types::EventError;
use tc_01_outbox::OutboxError;
use tc_02_punch_ledger::LedgerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AntiEntropyError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Includes `QueueSaturated`.
    #[error("Outbox error: {0}")]
    Outbox(#[from] OutboxError),

    #[error("Digest error: {0}")]
    Digest(#[from] EventError),

    #[error("Backfill channel error: {0}")]
    Channel(#[from] BackfillChannelError),
}
