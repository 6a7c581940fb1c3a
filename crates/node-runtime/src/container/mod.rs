//! # Subsystem Container
//!
//! Holds one node's subsystem instances with their lifetimes and wiring.
//!
//! - Each node owns its own container, so several simulated nodes can run
//!   in one process.
//! - Shared state is reached through `Arc`s; each subsystem guards its own
//!   state with a single mutex.

pub mod config;
pub mod subsystems;

pub use config::{ConfigError, NodeConfig};
pub use subsystems::SubsystemContainer;
