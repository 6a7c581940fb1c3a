//! # Inbound Event Handler
//!
//! Applies a peer's event to the local node, dispatching on its kind.
//!
//! ## Outcomes
//!
//! - `Ok(())`: the subscriber acknowledges. This includes diverged punches
//!   and rejected history syncs, which are logged and left to
//!   reconciliation since a redelivery would diverge again.
//! - `Err(_)`: the subscriber abandons, so the event is redelivered.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use shared_types::{EventPayload, SyncEvent};
use tc_02_punch_ledger::{LedgerError, PunchLedger, PunchOutcome};
use tc_03_anti_entropy::{BackfillResponder, ChecksumVerdict, Reconciler};

use crate::errors::SyncError;

#[derive(Clone, Copy, Debug)]
enum Punch {
    In,
    Out,
}

/// Dispatches decoded peer events.
pub struct InboundHandler {
    ledger: Arc<PunchLedger>,
    reconciler: Arc<Reconciler>,
    responder: Arc<BackfillResponder>,
}

impl InboundHandler {
    pub fn new(ledger: Arc<PunchLedger>, reconciler: Arc<Reconciler>, responder: Arc<BackfillResponder>) -> Self {
        Self {
            ledger,
            reconciler,
            responder,
        }
    }

    /// Apply `event`. The caller has already dropped self-originated events.
    pub async fn handle(&self, event: &SyncEvent) -> Result<(), SyncError> {
        let origin = event.origin_system_id();
        match event.payload() {
            EventPayload::PunchIn { badge } => self.apply_punch(Punch::In, origin, badge, event.timestamp()),
            EventPayload::PunchOut { badge } => self.apply_punch(Punch::Out, origin, badge, event.timestamp()),
            EventPayload::BadgeRosterSync { badges } => {
                let changed = self.ledger.merge_roster(badges.clone())?;
                debug!(origin, badges = badges.len(), changed, "[subscriber] Roster sync applied");
                Ok(())
            }
            EventPayload::PunchHistorySync { badge, punches } => match self.ledger.replace_history(badge, punches.clone()) {
                Ok(status) => {
                    info!(origin, badge = %badge, status = %status, "[subscriber] History sync applied");
                    Ok(())
                }
                Err(LedgerError::Diverged { divergence, .. }) => {
                    warn!(origin, badge = %badge, %divergence, "[subscriber] History sync not applied");
                    Ok(())
                }
                Err(e) => Err(e.into()),
            },
            EventPayload::ChecksumAnnounce { digest } => {
                let verdict = self.reconciler.on_checksum_announce(origin, digest)?;
                if verdict != ChecksumVerdict::InSync {
                    debug!(origin, badge = digest.badge_number(), ?verdict, "[subscriber] Checksum compared");
                }
                Ok(())
            }
            EventPayload::BackfillRequest { badge } => {
                self.responder.on_backfill_request(origin, badge).await?;
                Ok(())
            }
        }
    }

    fn apply_punch(&self, punch: Punch, origin: &str, badge: &str, at: DateTime<Utc>) -> Result<(), SyncError> {
        let result = match punch {
            Punch::In => self.ledger.punch_in(badge, at),
            Punch::Out => self.ledger.punch_out(badge, at),
        };

        match result {
            Ok(PunchOutcome::Applied) => {
                info!(origin, badge, ?punch, "[subscriber] Peer punch applied");
                Ok(())
            }
            Ok(PunchOutcome::AlreadyApplied) => {
                debug!(origin, badge, ?punch, "[subscriber] Duplicate punch ignored");
                Ok(())
            }
            Err(LedgerError::Diverged { divergence, .. }) => {
                warn!(origin, badge, ?punch, %divergence, "[subscriber] Diverged punch not applied");
                if !self.ledger.has_history(badge)? {
                    self.reconciler.request_backfill(badge)?;
                }
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
