//! Periodic checksum sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use tc_03_anti_entropy::Reconciler;

pub struct ReconcileTimer {
    reconciler: Arc<Reconciler>,
    interval: Duration,
}

impl ReconcileTimer {
    pub fn new(reconciler: Arc<Reconciler>, interval: Duration) -> Self {
        Self { reconciler, interval }
    }

    /// Sweep once immediately, then every `interval`, until `shutdown` flips.
    ///
    /// A failed sweep is logged and the next tick tries again.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval = ?self.interval, "[reconciler] Timer started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }
            if *shutdown.borrow() {
                break;
            }

            if let Err(e) = self.reconciler.sweep() {
                warn!(error = %e, "[reconciler] Sweep failed");
            }
        }

        info!("[reconciler] Timer stopped");
    }
}
