//! Application layer: reconciler and backfill responder.

pub mod reconciler;
pub mod responder;

pub use reconciler::{ChecksumVerdict, Reconciler};
pub use responder::BackfillResponder;
