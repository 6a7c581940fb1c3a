//! Error types for the punch ledger.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use shared_types::BadgeNumber;
use thiserror::Error;

/// Errors from the local record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Read or write failed.
    #[error("Record store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored file could not be parsed.
    #[error("Corrupt record file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Badge number cannot be used as a storage key.
    #[error("Badge number not storable: {0:?}")]
    InvalidBadge(BadgeNumber),
}

/// Why a punch could not be applied to the local history.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Divergence {
    /// Punch-out with nothing open.
    #[error("no open record to close")]
    NoOpenRecord,

    /// Punch-in while another record is still open.
    #[error("record opened at {since} is still open")]
    AlreadyOpen { since: DateTime<Utc> },

    /// Punch-out earlier than the open record's punch-in.
    #[error("punch-out at {at} precedes punch-in at {time_in}")]
    OutBeforeIn {
        at: DateTime<Utc>,
        time_in: DateTime<Utc>,
    },

    /// A replacement history with more than one open record.
    #[error("{count} records are open")]
    MultipleOpen { count: usize },
}

/// Errors from ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Local history disagrees with the punch; left for reconciliation.
    #[error("Diverged state for badge {badge}: {divergence}")]
    Diverged {
        badge: BadgeNumber,
        divergence: Divergence,
    },
}

impl LedgerError {
    pub fn is_diverged(&self) -> bool {
        matches!(self, LedgerError::Diverged { .. })
    }
}
