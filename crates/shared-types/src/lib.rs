//! # Shared Types Crate
//!
//! This crate contains the event model that crosses node boundaries and the
//! punch/badge entities every node keeps locally.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: The wire contract (`system_id`, `badge_num`,
//!   `event_type`, `ts`, `details`) is defined here and nowhere else.
//! - **Closed Event Type**: `SyncEvent` is a tagged variant; a payload that
//!   does not match its `event_type` is rejected while decoding, never by a
//!   handler.
//! - **Origin Identity**: `system_id` on the event is the only notion of
//!   sender; payloads never repeat it.

pub mod digest;
pub mod entities;
pub mod errors;
pub mod events;

pub use digest::{canonical_json, ChecksumDigest};
pub use entities::*;
pub use errors::*;
pub use events::{EventKind, EventPayload, SyncEvent, WireEvent};
