//! # TC-02 Punch Ledger
//!
//! **Subsystem ID:** 2
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Owns a node's badge roster and per-badge punch history. Every mutation,
//! whether from a local punch, a peer event or a backfill, goes through
//! [`PunchLedger`] so that reads and writes of one badge never interleave.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | At most one open record per badge | `domain/history.rs` - `punch_in()` |
//! | INVARIANT-2 | Redelivered punches are no-ops | `domain/history.rs` - `PunchOutcome::AlreadyApplied` |
//! | INVARIANT-3 | Diverged punches are never applied | `domain/history.rs` - `Divergence` |
//! | INVARIANT-4 | Status is derived from the last record | `domain/history.rs` - `derive_status()` |
//! | INVARIANT-5 | Single writer | `service.rs` - one mutex around the store |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! domain/    - history rules, roster merge, LedgerError
//! ports/     - RecordStore (local record store)
//! adapters/  - in-memory store, flat-file JSON store
//! service.rs - PunchLedger
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{FlatFileRecordStore, InMemoryRecordStore};
pub use domain::{derive_status, Divergence, LedgerError, PunchOutcome, StoreError};
pub use ports::RecordStore;
pub use service::PunchLedger;
