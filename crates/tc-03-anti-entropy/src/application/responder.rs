//! # Backfill Responder
//!
//! Answers a peer's `BackfillRequest` with the badge's full history, sent
//! point-to-point to the requester.

use std::sync::Arc;

use tracing::{debug, info};

use shared_bus::{BackfillChannel, BackfillResponse};
use shared_types::SystemId;
use tc_02_punch_ledger::PunchLedger;

use crate::domain::AntiEntropyError;

pub struct BackfillResponder {
    system_id: SystemId,
    ledger: Arc<PunchLedger>,
    channel: Arc<dyn BackfillChannel>,
}

impl BackfillResponder {
    pub fn new(system_id: impl Into<SystemId>, ledger: Arc<PunchLedger>, channel: Arc<dyn BackfillChannel>) -> Self {
        Self {
            system_id: system_id.into(),
            ledger,
            channel,
        }
    }

    /// Send `badge`'s history to `requester`.
    ///
    /// Returns `false` without sending when there is nothing to share.
    pub async fn on_backfill_request(&self, requester: &str, badge: &str) -> Result<bool, AntiEntropyError> {
        let punches = self.ledger.history(badge)?;
        if punches.is_empty() {
            debug!(badge, requester, "[responder] No local data; ignoring backfill request");
            return Ok(false);
        }

        let records = punches.len();
        let response = BackfillResponse {
            responder: self.system_id.clone(),
            badge_num: badge.to_string(),
            punches,
        };
        self.channel.send(requester, response).await?;
        info!(badge, requester, records, "[responder] Backfill sent");
        Ok(true)
    }
}
