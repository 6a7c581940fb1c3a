//! # Adapters
//!
//! `SnapshotStore` implementations.

pub mod file;
pub mod memory;

pub use file::JsonFileSnapshotStore;
pub use memory::InMemorySnapshotStore;
