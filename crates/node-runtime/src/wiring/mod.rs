//! # Task Wiring
//!
//! The long-running tasks of a node and how they connect the subsystems to
//! the transport.
//!
//! ```text
//!                     ┌───────────────────────────────┐
//!  TimeClock ──┐      │            Transport          │
//!  Reconciler ─┼─→ Outbox ──Publisher──→ topic ──Subscriber──→ InboundHandler
//!              │      │                               │            │
//!              │      └───────────────────────────────┘            ↓
//!              └────────────────────────────────────────── Ledger / Reconciler
//!                                                                / Responder
//! ```
//!
//! Every loop selects on the shared `watch` shutdown signal so that a
//! blocking receive or an idle wait ends promptly on shutdown.

pub mod backoff;
pub mod publisher;
pub mod reconcile;
pub mod subscriber;

pub use backoff::Backoff;
pub use publisher::{PublishReport, Publisher};
pub use reconcile::ReconcileTimer;
pub use subscriber::{Disposition, Subscriber};
