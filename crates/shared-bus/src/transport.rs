//! # Transport Port
//!
//! Message-bus shaped interface every transport binding implements.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Errors from transport operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The broker cannot be reached. Retry with backoff.
    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    /// No subscription with this name exists on the topic.
    #[error("Unknown subscription: {0}")]
    UnknownSubscription(SubscriptionName),

    /// The delivery's lock is no longer held (already settled or expired).
    #[error("Lock lost for delivery {0}")]
    LockLost(Uuid),
}

impl TransportError {
    /// Whether retrying the same call later can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Unavailable(_))
    }
}

/// A node's receive endpoint: one named subscription on a topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionName {
    pub topic: String,
    pub name: String,
}

impl SubscriptionName {
    pub fn new(topic: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for SubscriptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.topic, self.name)
    }
}

/// A received message, locked to the receiver until settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Token identifying this lock; settle with `acknowledge` or `abandon`.
    pub lock_token: Uuid,
    /// Subscription the message was received from.
    pub subscription: SubscriptionName,
    /// Encoded event bytes.
    pub body: Vec<u8>,
    /// 1 on first delivery, incremented on every redelivery.
    pub delivery_count: u32,
}

/// Publish/subscribe transport.
///
/// Implementations must be safe to share between the publisher and
/// subscriber tasks of a node.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Verify the broker is reachable and `subscription` exists.
    async fn check_subscription(&self, subscription: &SubscriptionName) -> Result<(), TransportError>;

    /// Publish one message to `topic`.
    async fn publish(&self, topic: &str, body: Vec<u8>) -> Result<(), TransportError>;

    /// Pull up to `max_count` messages, waiting at most `max_wait` for the
    /// first one. An empty batch means the wait expired.
    async fn receive(
        &self,
        subscription: &SubscriptionName,
        max_count: usize,
        max_wait: Duration,
    ) -> Result<Vec<Delivery>, TransportError>;

    /// Settle a delivery as processed; it is not delivered again.
    async fn acknowledge(&self, delivery: &Delivery) -> Result<(), TransportError>;

    /// Release a delivery unprocessed; it becomes redeliverable.
    async fn abandon(&self, delivery: &Delivery) -> Result<(), TransportError>;
}
