//! # Time Clock
//!
//! Local punch operations. Each applies the change to the ledger first,
//! then enqueues the event that tells peers about it. If the enqueue fails
//! the local change stays and the error is returned.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use shared_types::{BadgeNumber, SyncEvent, SystemId};
use tc_01_outbox::Outbox;
use tc_02_punch_ledger::{PunchLedger, PunchOutcome};

use crate::errors::SyncError;

pub struct TimeClock {
    system_id: SystemId,
    ledger: Arc<PunchLedger>,
    outbox: Arc<Outbox>,
}

impl TimeClock {
    pub fn new(system_id: impl Into<SystemId>, ledger: Arc<PunchLedger>, outbox: Arc<Outbox>) -> Self {
        Self {
            system_id: system_id.into(),
            ledger,
            outbox,
        }
    }

    pub fn punch_in(&self, badge: &str) -> Result<(), SyncError> {
        self.punch_in_at(badge, Utc::now())
    }

    pub fn punch_out(&self, badge: &str) -> Result<(), SyncError> {
        self.punch_out_at(badge, Utc::now())
    }

    /// Punch `badge` in at `at`.
    ///
    /// Fails with `DivergedState` if the badge already has an open record.
    pub fn punch_in_at(&self, badge: &str, at: DateTime<Utc>) -> Result<(), SyncError> {
        if self.ledger.punch_in(badge, at)? == PunchOutcome::AlreadyApplied {
            return Ok(());
        }
        info!(badge, "[clock] Punched in");
        self.outbox
            .enqueue(SyncEvent::punch_in(self.system_id.clone(), badge, at))?;
        Ok(())
    }

    /// Punch `badge` out at `at`.
    ///
    /// Fails with `DivergedState` if the badge has no open record; nothing
    /// is enqueued in that case.
    pub fn punch_out_at(&self, badge: &str, at: DateTime<Utc>) -> Result<(), SyncError> {
        if self.ledger.punch_out(badge, at)? == PunchOutcome::AlreadyApplied {
            return Ok(());
        }
        info!(badge, "[clock] Punched out");
        self.outbox
            .enqueue(SyncEvent::punch_out(self.system_id.clone(), badge, at))?;
        Ok(())
    }

    /// Punch out every badge that is on the clock. Returns the badges closed.
    pub fn punch_all_out(&self) -> Result<Vec<BadgeNumber>, SyncError> {
        self.punch_all_out_at(Utc::now())
    }

    /// Punch out every open badge at `at`.
    ///
    /// Every badge is closed locally even when announcing one fails; the
    /// first such failure is returned after the rest have been processed.
    pub fn punch_all_out_at(&self, at: DateTime<Utc>) -> Result<Vec<BadgeNumber>, SyncError> {
        let open = self.ledger.open_badges()?;
        let mut first_error = None;
        for badge in &open {
            if let Err(e) = self.punch_out_at(badge, at) {
                warn!(badge = %badge, error = %e, "[clock] Punch-out not announced");
                first_error.get_or_insert(e);
            }
        }
        if !open.is_empty() {
            info!(count = open.len(), "[clock] Punched all out");
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(open),
        }
    }

    /// Create or update a roster entry and broadcast the full roster.
    pub fn register_badge(
        &self,
        badge: &str,
        display_name: Option<String>,
        photo_url: Option<String>,
    ) -> Result<(), SyncError> {
        let roster = self.ledger.register_badge(badge, display_name, photo_url)?;
        self.outbox
            .enqueue(SyncEvent::roster_sync(self.system_id.clone(), roster))?;
        Ok(())
    }

    /// Broadcast `badge`'s full history. Returns `false` if there is none.
    pub fn share_history(&self, badge: &str) -> Result<bool, SyncError> {
        let punches = self.ledger.history(badge)?;
        if punches.is_empty() {
            warn!(badge, "[clock] No history to share");
            return Ok(false);
        }
        self.outbox
            .enqueue(SyncEvent::history_sync(self.system_id.clone(), badge, punches))?;
        Ok(true)
    }
}
