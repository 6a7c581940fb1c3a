//! # Outbound Ports
//!
//! The node's local record store. Synchronous: every call is made while the
//! ledger holds its lock.

use shared_types::{BadgeRoster, PunchRecord};

use crate::domain::StoreError;

/// Local record store.
pub trait RecordStore: Send + Sync {
    /// Punch list for `badge`. A badge with no stored data reads as empty.
    fn read_punches(&self, badge: &str) -> Result<Vec<PunchRecord>, StoreError>;

    /// Replace the punch list for `badge`.
    fn write_punches(&self, badge: &str, punches: &[PunchRecord]) -> Result<(), StoreError>;

    fn read_badges(&self) -> Result<BadgeRoster, StoreError>;

    fn write_badges(&self, roster: &BadgeRoster) -> Result<(), StoreError>;
}
