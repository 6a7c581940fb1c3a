//! # Ports
//!
//! - `outbound.rs` - where the queue snapshot lives

pub mod outbound;

pub use outbound::SnapshotStore;
