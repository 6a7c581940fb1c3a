//! # Error Types
//!
//! Errors raised while building, encoding or decoding events.

use thiserror::Error;

use crate::events::EventKind;

/// Reasons an event is rejected at the wire boundary.
///
/// Every variant is a `MalformedEvent` condition: the subscriber logs it and
/// acknowledges the message so it is never redelivered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// Bytes are not a JSON event object.
    #[error("Malformed event encoding: {0}")]
    Encoding(String),

    /// `system_id` is empty.
    #[error("Event is missing its origin system id")]
    MissingOrigin,

    /// A badge-scoped kind arrived without `badge_num`.
    #[error("{kind} event requires a badge number")]
    MissingBadge { kind: EventKind },

    /// A roster-wide kind arrived with `badge_num`.
    #[error("{kind} event must not carry a badge number")]
    UnexpectedBadge { kind: EventKind },

    /// `details` does not have the shape `event_type` demands.
    #[error("Invalid details for {kind} event: {reason}")]
    InvalidDetails { kind: EventKind, reason: String },

    /// Checksum is not a lowercase hex SHA-256 digest.
    #[error("Invalid checksum digest: {0}")]
    InvalidDigest(String),
}

impl From<serde_json::Error> for EventError {
    fn from(e: serde_json::Error) -> Self {
        EventError::Encoding(e.to_string())
    }
}
