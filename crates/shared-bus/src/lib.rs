//! # Shared Bus - Transport Between Time-Clock Nodes
//!
//! Every node of a system group publishes to one shared topic and owns one
//! subscription on it, so every node observes every event, its own included.
//!
//! ```text
//! ┌──────────┐  publish()   ┌──────────────┐  receive()  ┌──────────┐
//! │  Node A  │ ───────────→ │    Topic     │ ──────────→ │  Node B  │
//! │          │ ←─────────── │ (1 sub/node) │             │          │
//! └──────────┘  self-echo   └──────────────┘             └──────────┘
//!       ↑                                                      │
//!       └──────────── BackfillChannel (point-to-point) ────────┘
//! ```
//!
//! ## Contracts
//!
//! - **At-least-once:** A delivery that is abandoned, or not settled before
//!   its lock expires, is handed out again. Handlers must tolerate
//!   redelivery.
//! - **Broadcast:** Bulk payloads never travel on the topic; backfill
//!   responses use the addressed `BackfillChannel` instead.
//! - **Dead letters:** A message abandoned `max_delivery_count` times is
//!   parked on the subscription's dead-letter list.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod backfill;
pub mod memory;
pub mod transport;

// Re-export main types
pub use backfill::{BackfillChannel, BackfillChannelError, BackfillResponse, BackfillSink, DirectChannelHub};
pub use memory::InMemoryBroker;
pub use transport::{Delivery, SubscriptionName, Transport, TransportError};

/// Deliveries after which an abandoned message is dead-lettered.
pub const DEFAULT_MAX_DELIVERY_COUNT: u32 = 10;

/// How long a delivery stays locked to its receiver before redelivery.
pub const DEFAULT_LOCK_DURATION: std::time::Duration = std::time::Duration::from_secs(30);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_max_delivery_count() {
        assert_eq!(DEFAULT_MAX_DELIVERY_COUNT, 10);
    }
}
