//! # Backfill Channel
//!
//! Point-to-point delivery of one badge's full punch history to the node
//! that asked for it. Kept off the shared topic: a bulk payload there would
//! reach, and have to be discarded by, every other node.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use shared_types::{canonical_json, BadgeNumber, PunchRecord, SystemId};

/// Errors from backfill delivery.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackfillChannelError {
    /// No endpoint is registered for the requester.
    #[error("No backfill endpoint for system {0}")]
    UnknownRecipient(SystemId),

    /// The response could not be encoded or decoded.
    #[error("Backfill encoding error: {0}")]
    Encoding(String),

    /// The recipient received the response but could not apply it.
    #[error("Backfill rejected by recipient: {0}")]
    Rejected(String),

    /// The channel is not reachable right now.
    #[error("Backfill channel unavailable: {0}")]
    Unavailable(String),
}

/// Body of a backfill response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillResponse {
    /// Node that sent the history.
    pub responder: SystemId,
    /// Badge the history belongs to.
    pub badge_num: BadgeNumber,
    /// Full ordered punch list.
    pub punches: Vec<PunchRecord>,
}

impl BackfillResponse {
    /// Canonical JSON (sorted keys, compact).
    pub fn encode(&self) -> Result<Vec<u8>, BackfillChannelError> {
        canonical_json(self)
            .map(String::into_bytes)
            .map_err(|e| BackfillChannelError::Encoding(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, BackfillChannelError> {
        serde_json::from_slice(bytes).map_err(|e| BackfillChannelError::Encoding(e.to_string()))
    }
}

/// Sending side: address a response to a requester.
#[async_trait]
pub trait BackfillChannel: Send + Sync {
    /// Deliver `response` to the node identified by `requester`.
    async fn send(&self, requester: &str, response: BackfillResponse) -> Result<(), BackfillChannelError>;
}

/// Receiving side: applies a response addressed to this node.
#[async_trait]
pub trait BackfillSink: Send + Sync {
    async fn accept(&self, response: BackfillResponse) -> Result<(), BackfillChannelError>;
}

/// In-process router from system id to that node's sink.
///
/// Responses are encoded and decoded on the way through so the sink sees
/// exactly what a remote call would carry.
#[derive(Clone, Default)]
pub struct DirectChannelHub {
    endpoints: Arc<RwLock<HashMap<SystemId, Arc<dyn BackfillSink>>>>,
}

impl DirectChannelHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route responses for `system_id` to `sink`, replacing any previous one.
    pub fn register(&self, system_id: impl Into<SystemId>, sink: Arc<dyn BackfillSink>) {
        let system_id = system_id.into();
        debug!(system_id = %system_id, "Backfill endpoint registered");
        self.endpoints.write().insert(system_id, sink);
    }

    pub fn unregister(&self, system_id: &str) {
        self.endpoints.write().remove(system_id);
    }

    pub fn is_registered(&self, system_id: &str) -> bool {
        self.endpoints.read().contains_key(system_id)
    }
}

#[async_trait]
impl BackfillChannel for DirectChannelHub {
    async fn send(&self, requester: &str, response: BackfillResponse) -> Result<(), BackfillChannelError> {
        let sink = self
            .endpoints
            .read()
            .get(requester)
            .cloned()
            .ok_or_else(|| BackfillChannelError::UnknownRecipient(requester.to_string()))?;

        let bytes = response.encode()?;
        let received = BackfillResponse::decode(&bytes)?;
        debug!(
            requester,
            badge = %received.badge_num,
            records = received.punches.len(),
            bytes = bytes.len(),
            "Backfill delivered"
        );

        sink.accept(received).await.map_err(|e| {
            warn!(requester, error = %e, "Backfill rejected");
            e
        })
    }
}
