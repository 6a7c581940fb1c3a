//! # Punch Ledger Service
//!
//! Single-writer front for the record store. Each operation holds the lock
//! for its whole read-modify-write, so the publisher, subscriber and
//! reconciler tasks never see or produce a half-applied badge.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use shared_types::{Badge, BadgeNumber, BadgeRoster, BadgeStatus, PunchRecord};

use crate::domain::{self, Divergence, LedgerError, PunchOutcome};
use crate::ports::RecordStore;

/// Badge roster and punch history of one node.
pub struct PunchLedger {
    store: Mutex<Box<dyn RecordStore>>,
}

impl PunchLedger {
    pub fn new(store: impl RecordStore + 'static) -> Self {
        Self {
            store: Mutex::new(Box::new(store)),
        }
    }

    /// Open a record for `badge` at `at` and mark it `in`.
    pub fn punch_in(&self, badge: &str, at: DateTime<Utc>) -> Result<PunchOutcome, LedgerError> {
        self.apply(badge, |history| domain::punch_in(history, at))
    }

    /// Close the open record for `badge` at `at` and mark it `out`.
    pub fn punch_out(&self, badge: &str, at: DateTime<Utc>) -> Result<PunchOutcome, LedgerError> {
        self.apply(badge, |history| domain::punch_out(history, at))
    }

    fn apply<F>(&self, badge: &str, op: F) -> Result<PunchOutcome, LedgerError>
    where
        F: FnOnce(&mut Vec<PunchRecord>) -> Result<PunchOutcome, Divergence>,
    {
        let store = self.store.lock();
        let mut history = store.read_punches(badge)?;

        let outcome = op(&mut history).map_err(|divergence| LedgerError::Diverged {
            badge: badge.to_string(),
            divergence,
        })?;
        if outcome == PunchOutcome::AlreadyApplied {
            debug!(badge, "[ledger] Punch already applied");
            return Ok(outcome);
        }

        store.write_punches(badge, &history)?;
        set_status(&**store, badge, domain::derive_status(&history))?;
        Ok(outcome)
    }

    /// Replace `badge`'s history wholesale and derive its status.
    ///
    /// A list with more than one open record is rejected and nothing is
    /// written.
    pub fn replace_history(&self, badge: &str, mut punches: Vec<PunchRecord>) -> Result<BadgeStatus, LedgerError> {
        if let Err(divergence) = domain::check_history(&punches) {
            warn!(badge, error = %divergence, "[ledger] Replacement history rejected");
            return Err(LedgerError::Diverged {
                badge: badge.to_string(),
                divergence,
            });
        }
        domain::sort_history(&mut punches);
        domain::tabulate(&mut punches);
        let status = domain::derive_status(&punches);

        let store = self.store.lock();
        store.write_punches(badge, &punches)?;
        set_status(&**store, badge, status)?;
        info!(badge, records = punches.len(), status = %status, "[ledger] History replaced");
        Ok(status)
    }

    /// Merge a peer's roster into ours. Returns the number of changed badges.
    pub fn merge_roster(&self, incoming: BadgeRoster) -> Result<usize, LedgerError> {
        let store = self.store.lock();
        let mut roster = store.read_badges()?;

        // Status of badges with local history is ours to derive.
        let mut derived = Vec::with_capacity(incoming.len());
        for badge in incoming.keys() {
            let history = store.read_punches(badge)?;
            if !history.is_empty() {
                derived.push((badge.clone(), domain::derive_status(&history)));
            }
        }

        let changed = domain::merge_roster(&mut roster, incoming, |badge| {
            derived.iter().find(|(b, _)| b == badge).map(|(_, s)| *s)
        });
        if changed > 0 {
            store.write_badges(&roster)?;
            info!(changed, "[ledger] Roster merged");
        }
        Ok(changed)
    }

    /// Create or update a roster entry. Returns the full roster afterwards.
    pub fn register_badge(
        &self,
        badge: &str,
        display_name: Option<String>,
        photo_url: Option<String>,
    ) -> Result<BadgeRoster, LedgerError> {
        let store = self.store.lock();
        let mut roster = store.read_badges()?;
        let entry = roster.entry(badge.to_string()).or_insert_with(Badge::default);
        if display_name.is_some() {
            entry.display_name = display_name;
        }
        if photo_url.is_some() {
            entry.photo_url = photo_url;
        }
        store.write_badges(&roster)?;
        Ok(roster)
    }

    pub fn history(&self, badge: &str) -> Result<Vec<PunchRecord>, LedgerError> {
        Ok(self.store.lock().read_punches(badge)?)
    }

    pub fn has_history(&self, badge: &str) -> Result<bool, LedgerError> {
        Ok(!self.history(badge)?.is_empty())
    }

    pub fn roster(&self) -> Result<BadgeRoster, LedgerError> {
        Ok(self.store.lock().read_badges()?)
    }

    pub fn status(&self, badge: &str) -> Result<BadgeStatus, LedgerError> {
        Ok(self
            .roster()?
            .get(badge)
            .map(|b| b.status)
            .unwrap_or_default())
    }

    /// Roster badges with at least one punch record, with their histories.
    pub fn snapshot_histories(&self) -> Result<Vec<(BadgeNumber, Vec<PunchRecord>)>, LedgerError> {
        let store = self.store.lock();
        let roster = store.read_badges()?;
        let mut out = Vec::new();
        for badge in roster.into_keys() {
            let history = store.read_punches(&badge)?;
            if !history.is_empty() {
                out.push((badge, history));
            }
        }
        Ok(out)
    }

    /// Badges whose terminal record is open.
    pub fn open_badges(&self) -> Result<Vec<BadgeNumber>, LedgerError> {
        Ok(self
            .snapshot_histories()?
            .into_iter()
            .filter(|(_, history)| domain::derive_status(history) == BadgeStatus::In)
            .map(|(badge, _)| badge)
            .collect())
    }
}

/// Write `status` to the roster entry, creating it if the badge is unknown.
fn set_status(store: &dyn RecordStore, badge: &str, status: BadgeStatus) -> Result<(), LedgerError> {
    let mut roster = store.read_badges()?;
    match roster.get_mut(badge) {
        Some(entry) if entry.status == status => return Ok(()),
        Some(entry) => entry.status = status,
        None => {
            warn!(badge, "[ledger] Badge not in roster; adding unnamed entry");
            roster.insert(
                badge.to_string(),
                Badge {
                    status,
                    ..Badge::default()
                },
            );
        }
    }
    store.write_badges(&roster)?;
    Ok(())
}
