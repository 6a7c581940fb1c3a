//! # Tri-Time Test Suite
//!
//! Multi-node scenarios that run several nodes in one process over a
//! shared in-memory broker.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs      # Group of nodes over one broker
//!     ├── propagation.rs  # Punch flow and self-echo
//!     ├── convergence.rs  # Checksum and backfill
//!     └── durability.rs   # Saturation and restart
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p tc-tests
//! cargo test -p tc-tests integration::convergence
//! ```

pub mod integration;
