//! # TC-01 Durable Outbox
//!
//! **Subsystem ID:** 1
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Holds every event a node wants its peers to see until the transport has
//! taken it. Survives process restarts and transport outages.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | Persist before acknowledge | `service.rs` - `enqueue()` rolls back on save failure |
//! | INVARIANT-2 | Removed only after hand-off | `service.rs` - `confirm()` is the only removal |
//! | INVARIANT-3 | Requeue appends at the tail | `domain/queue.rs` - `requeue()` takes a fresh sequence |
//! | INVARIANT-4 | Bounded capacity | `domain/queue.rs` - `push()` returns `QueueSaturated` |
//!
//! ## Entry Lifecycle
//!
//! ```text
//! enqueue ──→ [PENDING] ──drain──→ publish ──ok──→ confirm ──→ [REMOVED]
//!                 ↑                   │
//!                 └──── requeue ──────┘ (fresh sequence, tail)
//! ```
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! domain/    - OutboxEntry, OutboxQueue, OutboxError
//! ports/     - SnapshotStore (where the queue is persisted)
//! adapters/  - JSON file store (atomic overwrite + fs2 lock), in-memory store
//! service.rs - Outbox: locking, wake-on-enqueue, Drain iterator
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{InMemorySnapshotStore, JsonFileSnapshotStore};
pub use config::OutboxConfig;
pub use domain::{OutboxEntry, OutboxError, OutboxQueue};
pub use ports::SnapshotStore;
pub use service::{Drain, Outbox};
