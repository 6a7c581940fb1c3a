//! # Node Runtime Library
//!
//! Runs one Tri-Time node: the subsystem container plus the publisher,
//! subscriber and reconciliation tasks. The `tritime-node` binary is a thin
//! wrapper around [`NodeRuntime`].
//!
//! ## Flow
//!
//! ```text
//!  TimeClock ──apply──→ Ledger          Subscriber ──decode──→ InboundHandler
//!      │                                    ↑                     │
//!      └──enqueue──→ Outbox ──Publisher──→ Topic           apply / reconcile
//!                      ↑                                          │
//!                      └────── ChecksumAnnounce, BackfillRequest ─┘
//! ```
//!
//! ## Modules
//!
//! - `container/` - Configuration and subsystem wiring
//! - `clock` - Local punch operations
//! - `handlers/` - Application of peer events
//! - `wiring/` - Long-running task loops
//! - `runtime` - Startup and shutdown

#![allow(clippy::type_complexity)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod clock;
pub mod container;
pub mod errors;
pub mod handlers;
pub mod runtime;
pub mod wiring;

pub use clock::TimeClock;
pub use container::{ConfigError, NodeConfig, SubsystemContainer};
pub use errors::{StartupError, SyncError};
pub use runtime::NodeRuntime;
