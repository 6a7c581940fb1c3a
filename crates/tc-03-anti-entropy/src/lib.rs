//! # TC-03 Anti-Entropy Reconciliation
//!
//! **Subsystem ID:** 3
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Detects and repairs badges a node is missing. Nodes periodically
//! announce a digest of each badge's history; a node that has never seen
//! the badge asks for it, and the holder answers point-to-point.
//!
//! ```text
//!   Node A (holds 1001)                    Node B (no data for 1001)
//!   ───────────────────                    ─────────────────────────
//!   sweep()
//!     └─ ChecksumAnnounce(1001) ──topic──→ on_checksum_announce()
//!                                            └─ mark pending
//!   on_backfill_request() ←──────topic──── BackfillRequest(1001)
//!     └─ BackfillResponse ───direct──────→ accept()
//!                                            └─ replace history, clear pending
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | Backfill only for badges with no local data | `application/reconciler.rs` |
//! | INVARIANT-2 | One outstanding request per badge until answered or expired | `domain/pending.rs` |
//! | INVARIANT-3 | Responses replace the local list wholesale | `application/reconciler.rs` - `accept()` |
//! | INVARIANT-4 | Requests for unknown badges are ignored | `application/responder.rs` |
//!
//! Digest mismatches between two nodes that both hold data are logged and
//! left alone.

pub mod application;
pub mod config;
pub mod domain;

pub use application::{BackfillResponder, ChecksumVerdict, Reconciler};
pub use config::AntiEntropyConfig;
pub use domain::{AntiEntropyError, PendingBackfills};
