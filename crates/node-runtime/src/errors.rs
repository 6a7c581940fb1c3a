//! # Runtime Errors
//!
//! | Variant | Handling |
//! |---------|----------|
//! | `TransportUnavailable` | retried with backoff |
//! | `QueueSaturated` | surfaced; enqueue fails until drained |
//! | `MalformedEvent` | logged, acknowledged, dropped |
//! | `DivergedState` | logged, left to reconciliation |
//!
//! None of these ends a task loop. Only [`StartupError`] keeps a node from
//! starting.

use thiserror::Error;

use shared_bus::{BackfillChannelError, TransportError};
use shared_types::{BadgeNumber, EventError};
use tc_01_outbox::OutboxError;
use tc_02_punch_ledger::LedgerError;
use tc_03_anti_entropy::AntiEntropyError;

use crate::container::ConfigError;

/// Errors raised while syncing with peers or applying local punches.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("Outbox saturated ({capacity} entries pending)")]
    QueueSaturated { capacity: usize },

    #[error("Malformed event: {0}")]
    MalformedEvent(#[from] EventError),

    #[error("Diverged state for badge {badge}: {reason}")]
    DivergedState { badge: BadgeNumber, reason: String },

    #[error("Transport error: {0}")]
    Transport(TransportError),

    #[error("Outbox error: {0}")]
    Outbox(OutboxError),

    #[error("Ledger error: {0}")]
    Ledger(LedgerError),

    #[error("Backfill error: {0}")]
    Backfill(BackfillChannelError),
}

impl From<TransportError> for SyncError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Unavailable(reason) => SyncError::TransportUnavailable(reason),
            other => SyncError::Transport(other),
        }
    }
}

impl From<OutboxError> for SyncError {
    fn from(e: OutboxError) -> Self {
        match e {
            OutboxError::QueueSaturated { capacity } => SyncError::QueueSaturated { capacity },
            other => SyncError::Outbox(other),
        }
    }
}

impl From<LedgerError> for SyncError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Diverged { badge, divergence } => SyncError::DivergedState {
                badge,
                reason: divergence.to_string(),
            },
            other => SyncError::Ledger(other),
        }
    }
}

impl From<BackfillChannelError> for SyncError {
    fn from(e: BackfillChannelError) -> Self {
        SyncError::Backfill(e)
    }
}

impl From<AntiEntropyError> for SyncError {
    fn from(e: AntiEntropyError) -> Self {
        match e {
            AntiEntropyError::Ledger(e) => e.into(),
            AntiEntropyError::Outbox(e) => e.into(),
            AntiEntropyError::Digest(e) => e.into(),
            AntiEntropyError::Channel(e) => e.into(),
        }
    }
}

/// Conditions that prevent a node from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Unreadable, corrupt or locked outbox.
    #[error("Outbox error: {0}")]
    Outbox(#[from] OutboxError),

    #[error("Transport unreachable: {0}")]
    Transport(#[from] TransportError),
}
