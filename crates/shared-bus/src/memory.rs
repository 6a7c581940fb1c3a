//! # In-Memory Broker
//!
//! Process-local `Transport` with broker semantics: named subscriptions,
//! peek-lock deliveries, redelivery on abandon or lock expiry, and
//! dead-lettering.
//! Lets several simulated nodes share one process; a real deployment binds
//! `Transport` to its message bus instead.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::transport::{Delivery, SubscriptionName, Transport, TransportError};
use crate::{DEFAULT_LOCK_DURATION, DEFAULT_MAX_DELIVERY_COUNT};

#[derive(Debug, Clone)]
struct StoredMessage {
    body: Vec<u8>,
    delivery_count: u32,
}

#[derive(Debug)]
struct LockedMessage {
    message: StoredMessage,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct SubscriptionQueue {
    ready: VecDeque<StoredMessage>,
    locked: HashMap<Uuid, LockedMessage>,
    dead_letters: Vec<Vec<u8>>,
}

impl SubscriptionQueue {
    /// Return a message to the head of the queue, or dead-letter it once it
    /// has used up its deliveries. Returns `true` if it was dead-lettered.
    fn release(&mut self, message: StoredMessage, max_delivery_count: u32) -> bool {
        if message.delivery_count >= max_delivery_count {
            self.dead_letters.push(message.body);
            true
        } else {
            self.ready.push_front(message);
            false
        }
    }

    /// Release every lock that expired by `now`, oldest delivery first at
    /// the head. Returns the earliest expiry still outstanding.
    fn reclaim_expired(&mut self, now: Instant, max_delivery_count: u32) -> Option<Instant> {
        let mut expired: Vec<(Uuid, Instant)> = self
            .locked
            .iter()
            .filter(|(_, locked)| locked.expires_at <= now)
            .map(|(token, locked)| (*token, locked.expires_at))
            .collect();
        // Pushed to the front in reverse so the earliest lock ends up first.
        expired.sort_by_key(|(_, expires_at)| std::cmp::Reverse(*expires_at));
        for (token, _) in expired {
            if let Some(locked) = self.locked.remove(&token) {
                debug!(lock_token = %token, "Lock expired; message released");
                self.release(locked.message, max_delivery_count);
            }
        }
        self.locked.values().map(|locked| locked.expires_at).min()
    }
}

#[derive(Debug, Default)]
struct BrokerState {
    /// topic -> subscription name -> queue
    topics: HashMap<String, HashMap<String, SubscriptionQueue>>,
}

/// In-memory topic broker.
///
/// Cloning is cheap; clones share the same topics.
#[derive(Clone)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    /// Wakes receivers waiting for messages.
    arrivals: Arc<Notify>,
    /// Outage switch for fault injection.
    available: Arc<AtomicBool>,
    /// Total messages accepted by `publish`.
    published: Arc<AtomicU64>,
    max_delivery_count: u32,
    /// How long a delivery stays locked before it is handed out again.
    lock_duration: Duration,
}

impl InMemoryBroker {
    /// Create an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_delivery_count(DEFAULT_MAX_DELIVERY_COUNT)
    }

    /// Create a broker with a custom dead-letter threshold.
    #[must_use]
    pub fn with_max_delivery_count(max_delivery_count: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(BrokerState::default())),
            arrivals: Arc::new(Notify::new()),
            available: Arc::new(AtomicBool::new(true)),
            published: Arc::new(AtomicU64::new(0)),
            max_delivery_count: max_delivery_count.max(1),
            lock_duration: DEFAULT_LOCK_DURATION,
        }
    }

    /// Set how long an unsettled delivery stays locked.
    #[must_use]
    pub fn with_lock_duration(mut self, lock_duration: Duration) -> Self {
        self.lock_duration = lock_duration;
        self
    }

    /// Create `subscription` if it does not exist yet.
    ///
    /// Only messages published after creation reach the subscription.
    pub fn create_subscription(&self, subscription: &SubscriptionName) {
        let mut state = self.state.lock();
        state
            .topics
            .entry(subscription.topic.clone())
            .or_default()
            .entry(subscription.name.clone())
            .or_default();
        debug!(subscription = %subscription, "Subscription created");
    }

    /// Simulate the broker going down (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
        if available {
            self.arrivals.notify_waiters();
        }
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Total messages accepted by `publish`.
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Messages waiting (not locked) on `subscription`.
    pub fn pending_count(&self, subscription: &SubscriptionName) -> usize {
        self.with_queue(subscription, |q| q.ready.len()).unwrap_or(0)
    }

    /// Messages not yet acknowledged or dead-lettered, locked ones included.
    pub fn unsettled_count(&self, subscription: &SubscriptionName) -> usize {
        self.with_queue(subscription, |q| q.ready.len() + q.locked.len())
            .unwrap_or(0)
    }

    /// Messages parked after too many deliveries.
    pub fn dead_letters(&self, subscription: &SubscriptionName) -> Vec<Vec<u8>> {
        self.with_queue(subscription, |q| q.dead_letters.clone())
            .unwrap_or_default()
    }

    fn with_queue<R>(
        &self,
        subscription: &SubscriptionName,
        f: impl FnOnce(&mut SubscriptionQueue) -> R,
    ) -> Option<R> {
        let mut state = self.state.lock();
        state
            .topics
            .get_mut(&subscription.topic)
            .and_then(|subs| subs.get_mut(&subscription.name))
            .map(f)
    }

    fn ensure_available(&self) -> Result<(), TransportError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(TransportError::Unavailable("in-memory broker offline".into()))
        }
    }

    /// Lock up to `max_count` ready messages. Also returns the earliest
    /// expiry among locks still held, so a waiting receiver can wake for it.
    fn take_batch(
        &self,
        subscription: &SubscriptionName,
        max_count: usize,
    ) -> Result<(Vec<Delivery>, Option<Instant>), TransportError> {
        let max = self.max_delivery_count;
        let expires_at = Instant::now() + self.lock_duration;
        self.with_queue(subscription, |queue| {
            let next_expiry = queue.reclaim_expired(Instant::now(), max);
            let mut batch = Vec::new();
            while batch.len() < max_count {
                let Some(mut message) = queue.ready.pop_front() else {
                    break;
                };
                message.delivery_count += 1;
                let lock_token = Uuid::new_v4();
                batch.push(Delivery {
                    lock_token,
                    subscription: subscription.clone(),
                    body: message.body.clone(),
                    delivery_count: message.delivery_count,
                });
                queue.locked.insert(lock_token, LockedMessage { message, expires_at });
            }
            let next_expiry = if batch.is_empty() {
                next_expiry
            } else {
                Some(next_expiry.map_or(expires_at, |next| next.min(expires_at)))
            };
            (batch, next_expiry)
        })
        .ok_or_else(|| TransportError::UnknownSubscription(subscription.clone()))
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for InMemoryBroker {
    async fn check_subscription(&self, subscription: &SubscriptionName) -> Result<(), TransportError> {
        self.ensure_available()?;
        self.with_queue(subscription, |_| ())
            .ok_or_else(|| TransportError::UnknownSubscription(subscription.clone()))
    }

    async fn publish(&self, topic: &str, body: Vec<u8>) -> Result<(), TransportError> {
        self.ensure_available()?;

        let receivers = {
            let mut state = self.state.lock();
            let subs = state.topics.entry(topic.to_string()).or_default();
            for queue in subs.values_mut() {
                queue.ready.push_back(StoredMessage {
                    body: body.clone(),
                    delivery_count: 0,
                });
            }
            subs.len()
        };

        self.published.fetch_add(1, Ordering::Relaxed);
        if receivers == 0 {
            warn!(topic, "Message dropped (no subscriptions)");
        } else {
            debug!(topic, receivers, "Message published");
        }
        self.arrivals.notify_waiters();
        Ok(())
    }

    async fn receive(
        &self,
        subscription: &SubscriptionName,
        max_count: usize,
        max_wait: Duration,
    ) -> Result<Vec<Delivery>, TransportError> {
        let deadline = Instant::now() + max_wait;
        loop {
            // Register interest before checking so a publish in between
            // still wakes us.
            let notified = self.arrivals.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            self.ensure_available()?;
            let (batch, next_expiry) = self.take_batch(subscription, max_count.max(1))?;
            if !batch.is_empty() {
                return Ok(batch);
            }

            let wake_at = next_expiry.map_or(deadline, |expiry| expiry.min(deadline));
            if tokio::time::timeout_at(wake_at, notified).await.is_err() && wake_at >= deadline {
                return Ok(Vec::new());
            }
        }
    }

    async fn acknowledge(&self, delivery: &Delivery) -> Result<(), TransportError> {
        self.ensure_available()?;
        let removed = self
            .with_queue(&delivery.subscription, |q| q.locked.remove(&delivery.lock_token))
            .ok_or_else(|| TransportError::UnknownSubscription(delivery.subscription.clone()))?;
        match removed {
            Some(_) => Ok(()),
            None => Err(TransportError::LockLost(delivery.lock_token)),
        }
    }

    async fn abandon(&self, delivery: &Delivery) -> Result<(), TransportError> {
        self.ensure_available()?;
        let max = self.max_delivery_count;
        let outcome = self
            .with_queue(&delivery.subscription, |q| {
                let locked = q.locked.remove(&delivery.lock_token)?;
                Some(q.release(locked.message, max))
            })
            .ok_or_else(|| TransportError::UnknownSubscription(delivery.subscription.clone()))?;

        match outcome {
            Some(true) => {
                warn!(
                    subscription = %delivery.subscription,
                    deliveries = delivery.delivery_count,
                    "Message dead-lettered"
                );
                Ok(())
            }
            Some(false) => {
                self.arrivals.notify_waiters();
                Ok(())
            }
            None => Err(TransportError::LockLost(delivery.lock_token)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(name: &str) -> SubscriptionName {
        SubscriptionName::new("trisonics", name)
    }

    #[tokio::test]
    async fn test_every_subscription_receives_every_message() {
        let broker = InMemoryBroker::new();
        broker.create_subscription(&sub("east"));
        broker.create_subscription(&sub("west"));

        broker.publish("trisonics", b"hello".to_vec()).await.unwrap();

        for name in ["east", "west"] {
            let batch = broker
                .receive(&sub(name), 10, Duration::from_millis(10))
                .await
                .unwrap();
            assert_eq!(batch.len(), 1);
            assert_eq!(batch[0].body, b"hello");
            assert_eq!(batch[0].delivery_count, 1);
        }
        assert_eq!(broker.published_count(), 1);
    }

    #[tokio::test]
    async fn test_receive_times_out_with_empty_batch() {
        let broker = InMemoryBroker::new();
        broker.create_subscription(&sub("east"));
        let batch = broker
            .receive(&sub("east"), 10, Duration::from_millis(20))
            .await
            .unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_receive_wakes_on_publish() {
        let broker = InMemoryBroker::new();
        broker.create_subscription(&sub("east"));

        let publisher = broker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            publisher.publish("trisonics", b"late".to_vec()).await.unwrap();
        });

        let batch = broker
            .receive(&sub("east"), 10, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test]
    async fn test_batch_is_bounded() {
        let broker = InMemoryBroker::new();
        broker.create_subscription(&sub("east"));
        for i in 0..5u8 {
            broker.publish("trisonics", vec![i]).await.unwrap();
        }
        let batch = broker
            .receive(&sub("east"), 3, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(broker.pending_count(&sub("east")), 2);
        assert_eq!(broker.unsettled_count(&sub("east")), 5);
    }

    #[tokio::test]
    async fn test_abandon_redelivers_with_higher_count() {
        let broker = InMemoryBroker::new();
        broker.create_subscription(&sub("east"));
        broker.publish("trisonics", b"retry".to_vec()).await.unwrap();

        let first = broker
            .receive(&sub("east"), 1, Duration::from_millis(10))
            .await
            .unwrap();
        broker.abandon(&first[0]).await.unwrap();

        let second = broker
            .receive(&sub("east"), 1, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(second[0].body, b"retry");
        assert_eq!(second[0].delivery_count, 2);

        broker.acknowledge(&second[0]).await.unwrap();
        assert_eq!(broker.pending_count(&sub("east")), 0);
    }

    #[tokio::test]
    async fn test_double_settle_is_lock_lost() {
        let broker = InMemoryBroker::new();
        broker.create_subscription(&sub("east"));
        broker.publish("trisonics", b"once".to_vec()).await.unwrap();
        let batch = broker
            .receive(&sub("east"), 1, Duration::from_millis(10))
            .await
            .unwrap();
        broker.acknowledge(&batch[0]).await.unwrap();
        assert_eq!(
            broker.acknowledge(&batch[0]).await,
            Err(TransportError::LockLost(batch[0].lock_token))
        );
    }

    #[tokio::test]
    async fn test_dead_letter_after_max_deliveries() {
        let broker = InMemoryBroker::with_max_delivery_count(2);
        broker.create_subscription(&sub("east"));
        broker.publish("trisonics", b"poison".to_vec()).await.unwrap();

        for _ in 0..2 {
            let batch = broker
                .receive(&sub("east"), 1, Duration::from_millis(10))
                .await
                .unwrap();
            broker.abandon(&batch[0]).await.unwrap();
        }

        assert_eq!(broker.pending_count(&sub("east")), 0);
        assert_eq!(broker.dead_letters(&sub("east")), vec![b"poison".to_vec()]);
    }

    #[tokio::test]
    async fn test_failed_abandon_is_redelivered_after_lock_expires() {
        let broker = InMemoryBroker::new().with_lock_duration(Duration::from_millis(50));
        broker.create_subscription(&sub("east"));
        broker.publish("trisonics", b"stuck".to_vec()).await.unwrap();

        let first = broker
            .receive(&sub("east"), 1, Duration::from_millis(10))
            .await
            .unwrap();
        broker.set_available(false);
        assert!(broker.abandon(&first[0]).await.is_err());
        broker.set_available(true);

        // The waiting receive wakes for the expiry, not only for publishes.
        let again = broker
            .receive(&sub("east"), 1, Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].body, b"stuck");
        assert_eq!(again[0].delivery_count, 2);
        assert_eq!(
            broker.acknowledge(&first[0]).await,
            Err(TransportError::LockLost(first[0].lock_token))
        );

        broker.acknowledge(&again[0]).await.unwrap();
        assert_eq!(broker.unsettled_count(&sub("east")), 0);
    }

    #[tokio::test]
    async fn test_expired_locks_return_ahead_of_newer_messages() {
        let broker = InMemoryBroker::new().with_lock_duration(Duration::from_millis(20));
        broker.create_subscription(&sub("east"));
        broker.publish("trisonics", b"old".to_vec()).await.unwrap();
        broker
            .receive(&sub("east"), 1, Duration::from_millis(10))
            .await
            .unwrap();
        broker.publish("trisonics", b"new".to_vec()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        let batch = broker
            .receive(&sub("east"), 10, Duration::from_millis(10))
            .await
            .unwrap();
        let bodies: Vec<_> = batch.iter().map(|d| d.body.clone()).collect();
        assert_eq!(bodies, vec![b"old".to_vec(), b"new".to_vec()]);
    }

    #[tokio::test]
    async fn test_expired_lock_counts_toward_dead_letter() {
        let broker = InMemoryBroker::with_max_delivery_count(1).with_lock_duration(Duration::from_millis(20));
        broker.create_subscription(&sub("east"));
        broker.publish("trisonics", b"poison".to_vec()).await.unwrap();
        broker
            .receive(&sub("east"), 1, Duration::from_millis(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(broker
            .receive(&sub("east"), 1, Duration::from_millis(10))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(broker.dead_letters(&sub("east")), vec![b"poison".to_vec()]);
    }

    #[tokio::test]
    async fn test_outage_fails_fast() {
        let broker = InMemoryBroker::new();
        broker.create_subscription(&sub("east"));
        broker.set_available(false);

        let err = broker.publish("trisonics", b"x".to_vec()).await.unwrap_err();
        assert!(err.is_transient());
        assert!(broker
            .receive(&sub("east"), 1, Duration::from_millis(10))
            .await
            .is_err());

        broker.set_available(true);
        broker.publish("trisonics", b"x".to_vec()).await.unwrap();
    }

    #[tokio::test]
    async fn test_check_subscription() {
        let broker = InMemoryBroker::new();
        assert!(matches!(
            broker.check_subscription(&sub("east")).await,
            Err(TransportError::UnknownSubscription(_))
        ));

        broker.create_subscription(&sub("east"));
        assert!(broker.check_subscription(&sub("east")).await.is_ok());

        broker.set_available(false);
        assert!(matches!(
            broker.check_subscription(&sub("east")).await,
            Err(TransportError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_subscription() {
        let broker = InMemoryBroker::new();
        let err = broker
            .receive(&sub("ghost"), 1, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::UnknownSubscription(_)));
    }
}
