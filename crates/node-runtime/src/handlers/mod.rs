//! # Event Handlers
//!
//! Application of peer events to the local node.

pub mod inbound;

pub use inbound::InboundHandler;
