//! # Reconciler
//!
//! Announces local digests and asks peers for badges this node lacks.
//! Also the receiving end of the backfill channel: responses land in
//! [`Reconciler::accept`] via the [`BackfillSink`] impl.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use shared_bus::{BackfillChannelError, BackfillResponse, BackfillSink};
use shared_types::{BadgeNumber, BadgeStatus, ChecksumDigest, EventKind, SyncEvent, SystemId};
use tc_01_outbox::{Outbox, OutboxError};
use tc_02_punch_ledger::PunchLedger;

use crate::config::AntiEntropyConfig;
use crate::domain::{AntiEntropyError, PendingBackfills};

/// What a foreign checksum announcement led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumVerdict {
    /// Local digest equals the announced one.
    InSync,
    /// Both nodes hold data and it differs; logged only.
    Mismatch,
    /// No local data; a backfill request was enqueued.
    BackfillRequested,
    /// No local data; a request is already outstanding.
    AwaitingBackfill,
}

/// Anti-entropy driver for one node.
pub struct Reconciler {
    system_id: SystemId,
    ledger: Arc<PunchLedger>,
    outbox: Arc<Outbox>,
    pending: Mutex<PendingBackfills>,
}

impl Reconciler {
    pub fn new(
        system_id: impl Into<SystemId>,
        config: AntiEntropyConfig,
        ledger: Arc<PunchLedger>,
        outbox: Arc<Outbox>,
    ) -> Self {
        Self {
            system_id: system_id.into(),
            ledger,
            outbox,
            pending: Mutex::new(PendingBackfills::new(config.backfill_ttl)),
        }
    }

    /// Enqueue a `ChecksumAnnounce` for every badge with local history.
    ///
    /// Badges whose previous announcement is still queued are skipped, so a
    /// stalled publisher holds at most one announcement per badge. Stops at
    /// the first enqueue failure; the rest are announced on the next sweep.
    /// Returns the number of announcements enqueued.
    pub fn sweep(&self) -> Result<usize, AntiEntropyError> {
        let histories = self.ledger.snapshot_histories()?;
        let queued = self.queued_announcements();
        let mut announced = 0;

        for (badge, punches) in &histories {
            if queued.contains(badge) {
                debug!(badge = %badge, "[reconciler] Announcement still queued");
                continue;
            }
            let digest = ChecksumDigest::compute(badge, punches)?;
            let event = SyncEvent::checksum_announce(self.system_id.clone(), digest);
            if let Err(e) = self.outbox.enqueue(event) {
                if matches!(e, OutboxError::QueueSaturated { .. }) {
                    error!(announced, "[reconciler] Outbox saturated; sweep cut short");
                }
                return Err(e.into());
            }
            announced += 1;
        }

        debug!(announced, skipped = queued.len(), "[reconciler] Sweep complete");
        Ok(announced)
    }

    fn queued_announcements(&self) -> HashSet<BadgeNumber> {
        self.outbox
            .snapshot()
            .into_iter()
            .filter(|entry| entry.event.kind() == EventKind::ChecksumAnnounce)
            .filter_map(|entry| entry.event.badge_number().map(str::to_string))
            .collect()
    }

    /// Handle a peer's digest for one badge.
    pub fn on_checksum_announce(
        &self,
        origin: &str,
        digest: &ChecksumDigest,
    ) -> Result<ChecksumVerdict, AntiEntropyError> {
        let badge = digest.badge_number();
        let local = self.ledger.history(badge)?;

        if local.is_empty() {
            return Ok(if self.request_backfill(badge)? {
                ChecksumVerdict::BackfillRequested
            } else {
                ChecksumVerdict::AwaitingBackfill
            });
        }

        let ours = ChecksumDigest::compute(badge, &local)?;
        if ours.matches(digest) {
            return Ok(ChecksumVerdict::InSync);
        }
        warn!(
            badge,
            origin,
            ours = ours.hash(),
            theirs = digest.hash(),
            "[reconciler] Digest mismatch; both nodes hold data, not repairing"
        );
        Ok(ChecksumVerdict::Mismatch)
    }

    /// Enqueue a `BackfillRequest` for `badge` unless one is outstanding.
    ///
    /// Returns `true` if a request was enqueued.
    pub fn request_backfill(&self, badge: &str) -> Result<bool, AntiEntropyError> {
        if !self.pending.lock().try_mark(badge, Instant::now()) {
            debug!(badge, "[reconciler] Backfill already requested");
            return Ok(false);
        }

        let event = SyncEvent::backfill_request(self.system_id.clone(), badge);
        if let Err(e) = self.outbox.enqueue(event) {
            // Not sent, so the next announcement may try again.
            self.pending.lock().clear(badge);
            return Err(e.into());
        }
        info!(badge, "[reconciler] Backfill requested");
        Ok(true)
    }

    /// Apply a backfill response: wholesale replace, then clear the marker.
    pub fn apply_backfill(&self, response: BackfillResponse) -> Result<BadgeStatus, AntiEntropyError> {
        let BackfillResponse {
            responder,
            badge_num,
            punches,
        } = response;

        if !self.pending.lock().is_pending(&badge_num, Instant::now()) {
            debug!(badge = %badge_num, responder = %responder, "[reconciler] Unsolicited or late backfill");
        }
        let status = self.ledger.replace_history(&badge_num, punches)?;
        self.pending.lock().clear(&badge_num);
        info!(badge = %badge_num, responder = %responder, status = %status, "[reconciler] Backfill applied");
        Ok(status)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn system_id(&self) -> &str {
        &self.system_id
    }
}

#[async_trait]
impl BackfillSink for Reconciler {
    async fn accept(&self, response: BackfillResponse) -> Result<(), BackfillChannelError> {
        self.apply_backfill(response)
            .map(|_| ())
            .map_err(|e| BackfillChannelError::Rejected(e.to_string()))
    }
}
