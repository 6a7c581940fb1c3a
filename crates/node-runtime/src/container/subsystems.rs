//! # Subsystem Container
//!
//! Builds and holds the subsystems of one node.
//!
//! ## Initialization Order
//!
//! ```text
//! Level 0: Outbox (tc-01), Punch Ledger (tc-02)
//! Level 1: Reconciler, Backfill Responder (tc-03) - need outbox + ledger
//! Level 2: Time Clock, Inbound Handler - need all of the above
//! ```

use std::sync::Arc;

use tracing::info;

use shared_bus::{BackfillChannel, BackfillSink};
use tc_01_outbox::Outbox;
use tc_02_punch_ledger::{PunchLedger, RecordStore};
use tc_03_anti_entropy::{BackfillResponder, Reconciler};

use crate::clock::TimeClock;
use crate::container::config::NodeConfig;
use crate::handlers::InboundHandler;

/// Central container holding all subsystem instances of one node.
pub struct SubsystemContainer {
    pub config: NodeConfig,

    // =========================================================================
    // LEVEL 0: No dependencies
    // =========================================================================
    /// Outbound events (tc-01).
    pub outbox: Arc<Outbox>,
    /// Roster and punch history (tc-02).
    pub ledger: Arc<PunchLedger>,

    // =========================================================================
    // LEVEL 1: Depends on Level 0
    // =========================================================================
    /// Checksum sweep and backfill requester (tc-03).
    pub reconciler: Arc<Reconciler>,
    /// Answers peers' backfill requests (tc-03).
    pub responder: Arc<BackfillResponder>,

    // =========================================================================
    // LEVEL 2: Entry points
    // =========================================================================
    /// Local punches.
    pub clock: TimeClock,
    /// Peer events.
    pub inbound: Arc<InboundHandler>,
}

impl SubsystemContainer {
    /// Wire a node around an already-opened outbox.
    pub fn new(
        config: NodeConfig,
        outbox: Outbox,
        store: impl RecordStore + 'static,
        channel: Arc<dyn BackfillChannel>,
    ) -> Self {
        let system_id = config.identity.system_id.clone();
        info!(system_id = %system_id, "Initializing subsystems");

        let outbox = Arc::new(outbox);
        let ledger = Arc::new(PunchLedger::new(store));

        let reconciler = Arc::new(Reconciler::new(
            system_id.clone(),
            config.anti_entropy_config(),
            Arc::clone(&ledger),
            Arc::clone(&outbox),
        ));
        let responder = Arc::new(BackfillResponder::new(
            system_id.clone(),
            Arc::clone(&ledger),
            channel,
        ));

        let clock = TimeClock::new(system_id, Arc::clone(&ledger), Arc::clone(&outbox));
        let inbound = Arc::new(InboundHandler::new(
            Arc::clone(&ledger),
            Arc::clone(&reconciler),
            Arc::clone(&responder),
        ));

        Self {
            config,
            outbox,
            ledger,
            reconciler,
            responder,
            clock,
            inbound,
        }
    }

    pub fn system_id(&self) -> &str {
        &self.config.identity.system_id
    }

    /// Where backfill responses for this node are delivered.
    pub fn backfill_sink(&self) -> Arc<dyn BackfillSink> {
        Arc::clone(&self.reconciler) as Arc<dyn BackfillSink>
    }
}
