//! # Subscriber
//!
//! Pulls this node's subscription and hands peer events to the
//! [`InboundHandler`].
//!
//! ## Per Delivery
//!
//! | Condition | Settlement |
//! |-----------|------------|
//! | body does not decode | acknowledge (dropped) |
//! | origin is this node | acknowledge (self-echo) |
//! | handler succeeds | acknowledge |
//! | handler fails | abandon (redelivered) |
//!
//! Receive failures back off exponentially up to a cap and never end the
//! loop; only shutdown does.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use shared_bus::{Delivery, SubscriptionName, Transport, TransportError};
use shared_types::{SyncEvent, SystemId};

use crate::handlers::InboundHandler;
use crate::wiring::backoff::Backoff;

/// How a delivery was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Applied,
    SelfEcho,
    Malformed,
    Abandoned,
}

pub struct Subscriber {
    system_id: SystemId,
    transport: Arc<dyn Transport>,
    subscription: SubscriptionName,
    handler: Arc<InboundHandler>,
    batch: usize,
    wait: Duration,
    backoff: Backoff,
}

impl Subscriber {
    pub fn new(
        system_id: impl Into<SystemId>,
        transport: Arc<dyn Transport>,
        subscription: SubscriptionName,
        handler: Arc<InboundHandler>,
        batch: usize,
        wait: Duration,
        backoff: Backoff,
    ) -> Self {
        Self {
            system_id: system_id.into(),
            transport,
            subscription,
            handler,
            batch: batch.max(1),
            wait,
            backoff,
        }
    }

    /// Receive one batch and settle every delivery in it.
    pub async fn poll_once(&self) -> Result<Vec<Disposition>, TransportError> {
        let deliveries = self
            .transport
            .receive(&self.subscription, self.batch, self.wait)
            .await?;

        let mut settled = Vec::with_capacity(deliveries.len());
        for delivery in deliveries {
            settled.push(self.process(&delivery).await);
        }
        Ok(settled)
    }

    async fn process(&self, delivery: &Delivery) -> Disposition {
        let event = match SyncEvent::decode(&delivery.body) {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    subscription = %self.subscription,
                    bytes = delivery.body.len(),
                    error = %e,
                    "[subscriber] Malformed event dropped"
                );
                self.settle(delivery, true).await;
                return Disposition::Malformed;
            }
        };

        if event.is_from(&self.system_id) {
            debug!(kind = %event.kind(), "[subscriber] Self-echo acknowledged");
            self.settle(delivery, true).await;
            return Disposition::SelfEcho;
        }

        match self.handler.handle(&event).await {
            Ok(()) => {
                self.settle(delivery, true).await;
                Disposition::Applied
            }
            Err(e) => {
                warn!(
                    origin = event.origin_system_id(),
                    kind = %event.kind(),
                    deliveries = delivery.delivery_count,
                    error = %e,
                    "[subscriber] Handler failed; abandoning for redelivery"
                );
                self.settle(delivery, false).await;
                Disposition::Abandoned
            }
        }
    }

    async fn settle(&self, delivery: &Delivery, acknowledge: bool) {
        let result = if acknowledge {
            self.transport.acknowledge(delivery).await
        } else {
            self.transport.abandon(delivery).await
        };
        if let Err(e) = result {
            // The broker redelivers once the lock lapses.
            warn!(lock_token = %delivery.lock_token, acknowledge, error = %e, "[subscriber] Settlement failed");
        }
    }

    /// Run until `shutdown` flips.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(subscription = %self.subscription, "[subscriber] Started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let polled = tokio::select! {
                polled = self.poll_once() => polled,
                _ = shutdown.changed() => break,
            };

            match polled {
                Ok(_) => self.backoff.reset(),
                Err(e) => {
                    let delay = self.backoff.next_delay();
                    if e.is_transient() {
                        warn!(error = %e, retry_in = ?delay, "[subscriber] Receive failed");
                    } else {
                        error!(error = %e, retry_in = ?delay, "[subscriber] Receive failed");
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.changed() => break,
                    }
                }
            }
        }

        info!(subscription = %self.subscription, "[subscriber] Stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use shared_bus::{DirectChannelHub, InMemoryBroker};
    use shared_types::BadgeStatus;
    use tc_01_outbox::{InMemorySnapshotStore, Outbox, OutboxConfig};
    use tc_02_punch_ledger::{InMemoryRecordStore, PunchLedger};
    use tc_03_anti_entropy::{AntiEntropyConfig, BackfillResponder, Reconciler};

    struct Fixture {
        subscriber: Subscriber,
        broker: InMemoryBroker,
        ledger: Arc<PunchLedger>,
        outbox: Arc<Outbox>,
        sub: SubscriptionName,
    }

    fn fixture() -> Fixture {
        let broker = InMemoryBroker::with_max_delivery_count(3);
        let sub = SubscriptionName::new("trisonics", "west");
        broker.create_subscription(&sub);

        let ledger = Arc::new(PunchLedger::new(InMemoryRecordStore::new()));
        let outbox = Arc::new(Outbox::open(OutboxConfig::default(), InMemorySnapshotStore::new()).unwrap());
        let reconciler = Arc::new(Reconciler::new(
            "west",
            AntiEntropyConfig::default(),
            ledger.clone(),
            outbox.clone(),
        ));
        // No endpoints registered: every backfill send fails.
        let responder = Arc::new(BackfillResponder::new(
            "west",
            ledger.clone(),
            Arc::new(DirectChannelHub::new()),
        ));
        let handler = Arc::new(InboundHandler::new(ledger.clone(), reconciler, responder));

        let subscriber = Subscriber::new(
            "west",
            Arc::new(broker.clone()),
            sub.clone(),
            handler,
            10,
            Duration::from_millis(20),
            Backoff::new(Duration::from_millis(5), Duration::from_millis(20)),
        );
        Fixture {
            subscriber,
            broker,
            ledger,
            outbox,
            sub,
        }
    }

    fn at(hour: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 7, hour, 0, 0).unwrap()
    }

    async fn publish(broker: &InMemoryBroker, event: &SyncEvent) {
        broker.publish("trisonics", event.encode().unwrap()).await.unwrap();
    }

    #[tokio::test]
    async fn test_peer_event_applied_and_acknowledged() {
        let f = fixture();
        publish(&f.broker, &SyncEvent::punch_in("east", "1001", at(8))).await;

        assert_eq!(f.subscriber.poll_once().await.unwrap(), vec![Disposition::Applied]);
        assert_eq!(f.ledger.status("1001").unwrap(), BadgeStatus::In);
        assert_eq!(f.broker.pending_count(&f.sub), 0);
    }

    #[tokio::test]
    async fn test_self_echo_is_not_applied() {
        let f = fixture();
        publish(&f.broker, &SyncEvent::punch_in("west", "1001", at(8))).await;

        assert_eq!(f.subscriber.poll_once().await.unwrap(), vec![Disposition::SelfEcho]);
        assert!(!f.ledger.has_history("1001").unwrap());
        assert!(f.outbox.is_empty());
        assert_eq!(f.broker.pending_count(&f.sub), 0);
    }

    #[tokio::test]
    async fn test_malformed_body_is_acknowledged() {
        let f = fixture();
        f.broker
            .publish("trisonics", br#"{"system_id":"east","event_type":"punch_in"}"#.to_vec())
            .await
            .unwrap();

        assert_eq!(f.subscriber.poll_once().await.unwrap(), vec![Disposition::Malformed]);
        assert_eq!(f.broker.pending_count(&f.sub), 0);
        assert!(f.broker.dead_letters(&f.sub).is_empty());
    }

    #[tokio::test]
    async fn test_handler_failure_is_abandoned_then_dead_lettered() {
        let f = fixture();
        f.ledger.punch_in("1001", at(8)).unwrap();
        publish(&f.broker, &SyncEvent::backfill_request("east", "1001")).await;

        for _ in 0..3 {
            assert_eq!(f.subscriber.poll_once().await.unwrap(), vec![Disposition::Abandoned]);
        }
        assert_eq!(f.broker.dead_letters(&f.sub).len(), 1);
        assert!(f.subscriber.poll_once().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_survives_outage() {
        let f = fixture();
        let broker = f.broker.clone();
        let ledger = f.ledger.clone();
        broker.set_available(false);

        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(f.subscriber.run(rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!task.is_finished());

        broker.set_available(true);
        publish(&broker, &SyncEvent::punch_in("east", "1001", at(8))).await;

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while ledger.status("1001").unwrap() != BadgeStatus::In {
            assert!(tokio::time::Instant::now() < deadline, "event never applied");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("subscriber should stop")
            .unwrap();
    }
}
