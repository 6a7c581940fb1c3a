//! # Publisher
//!
//! Moves outbox entries to the shared topic.
//!
//! ## Pass
//!
//! 1. Drain up to `batch` of the oldest entries.
//! 2. Publish each: success confirms it, failure requeues it at the tail.
//! 3. Persist the outbox snapshot.
//!
//! Between passes the task waits for an enqueue, the publish interval or
//! shutdown, whichever comes first.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use shared_bus::Transport;
use tc_01_outbox::Outbox;

/// Counts from one publish pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub sent: usize,
    pub requeued: usize,
    /// Entries that could not be encoded and were discarded.
    pub dropped: usize,
}

impl PublishReport {
    pub fn attempted(&self) -> usize {
        self.sent + self.requeued + self.dropped
    }
}

pub struct Publisher {
    outbox: Arc<Outbox>,
    transport: Arc<dyn Transport>,
    topic: String,
    batch: usize,
    interval: Duration,
}

impl Publisher {
    pub fn new(
        outbox: Arc<Outbox>,
        transport: Arc<dyn Transport>,
        topic: impl Into<String>,
        batch: usize,
        interval: Duration,
    ) -> Self {
        Self {
            outbox,
            transport,
            topic: topic.into(),
            batch: batch.max(1),
            interval,
        }
    }

    /// One publish pass.
    pub async fn publish_pending(&self) -> PublishReport {
        let mut report = PublishReport::default();

        for entry in self.outbox.drain().take(self.batch) {
            let body = match entry.event.encode() {
                Ok(body) => body,
                Err(e) => {
                    error!(sequence = entry.sequence, error = %e, "[publisher] Unencodable entry dropped");
                    self.outbox.confirm(entry.sequence);
                    report.dropped += 1;
                    continue;
                }
            };

            match self.transport.publish(&self.topic, body).await {
                Ok(()) => {
                    self.outbox.confirm(entry.sequence);
                    report.sent += 1;
                }
                Err(e) => {
                    warn!(
                        sequence = entry.sequence,
                        kind = %entry.event.kind(),
                        error = %e,
                        "[publisher] Publish failed; requeued"
                    );
                    self.outbox.requeue(&entry);
                    report.requeued += 1;
                }
            }
        }

        if report.attempted() > 0 {
            if let Err(e) = self.outbox.persist() {
                error!(error = %e, "[publisher] Failed to persist outbox");
            }
            debug!(
                sent = report.sent,
                requeued = report.requeued,
                pending = self.outbox.len(),
                "[publisher] Pass complete"
            );
        }
        report
    }

    /// Run until `shutdown` flips.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(topic = %self.topic, "[publisher] Started");

        loop {
            if *shutdown.borrow() {
                break;
            }
            let report = self.publish_pending().await;

            // A full clean batch means more may be waiting.
            if report.sent == self.batch && !self.outbox.is_empty() {
                continue;
            }

            tokio::select! {
                _ = self.outbox.notified() => {}
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        if let Err(e) = self.outbox.persist() {
            error!(error = %e, "[publisher] Failed to persist outbox on shutdown");
        }
        info!(pending = self.outbox.len(), "[publisher] Stopped");
    }
}
