//! In-memory record store for tests and simulated nodes.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use shared_types::{BadgeNumber, BadgeRoster, PunchRecord};

use crate::domain::StoreError;
use crate::ports::RecordStore;

#[derive(Default)]
struct Records {
    roster: BadgeRoster,
    punches: HashMap<BadgeNumber, Vec<PunchRecord>>,
}

/// Shared in-memory store. Clones see the same data.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    records: Arc<RwLock<Records>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a badge's history.
    pub fn with_punches(self, badge: impl Into<BadgeNumber>, punches: Vec<PunchRecord>) -> Self {
        self.records.write().punches.insert(badge.into(), punches);
        self
    }

    /// Seed the roster.
    pub fn with_roster(self, roster: BadgeRoster) -> Self {
        self.records.write().roster = roster;
        self
    }
}

impl RecordStore for InMemoryRecordStore {
    fn read_punches(&self, badge: &str) -> Result<Vec<PunchRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .punches
            .get(badge)
            .cloned()
            .unwrap_or_default())
    }

    fn write_punches(&self, badge: &str, punches: &[PunchRecord]) -> Result<(), StoreError> {
        self.records
            .write()
            .punches
            .insert(badge.to_string(), punches.to_vec());
        Ok(())
    }

    fn read_badges(&self) -> Result<BadgeRoster, StoreError> {
        Ok(self.records.read().roster.clone())
    }

    fn write_badges(&self, roster: &BadgeRoster) -> Result<(), StoreError> {
        self.records.write().roster = roster.clone();
        Ok(())
    }
}
