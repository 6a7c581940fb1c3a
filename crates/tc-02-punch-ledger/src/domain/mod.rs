//! Domain layer: punch history rules and roster merge.

pub mod errors;
pub mod history;
pub mod roster;

pub use errors::{Divergence, LedgerError, StoreError};
pub use history::{check_history, derive_status, punch_in, punch_out, sort_history, tabulate, PunchOutcome};
pub use roster::merge_roster;
