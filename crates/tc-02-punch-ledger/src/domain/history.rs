//! # Punch History Rules
//!
//! Pure functions over one badge's punch list. The list is kept sorted by
//! punch-in time and holds at most one open record.
//!
//! ## Redelivery
//!
//! The transport delivers at least once, so the same punch can arrive more
//! than once. A punch-in whose timestamp already starts a record, or a
//! punch-out whose timestamp already closes one, is reported as
//! `AlreadyApplied` and leaves the list untouched.

use chrono::{DateTime, SubsecRound, Utc};
use shared_types::{BadgeStatus, PunchRecord};

use super::errors::Divergence;

/// Result of applying a punch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunchOutcome {
    /// The list changed.
    Applied,
    /// The same punch was applied earlier; nothing changed.
    AlreadyApplied,
}

/// Open a record at `at`.
pub fn punch_in(history: &mut Vec<PunchRecord>, at: DateTime<Utc>) -> Result<PunchOutcome, Divergence> {
    let at = at.trunc_subsecs(0);
    if history.iter().any(|r| r.time_in == at) {
        return Ok(PunchOutcome::AlreadyApplied);
    }
    if let Some(open) = history.iter().find(|r| r.is_open()) {
        return Err(Divergence::AlreadyOpen { since: open.time_in });
    }

    history.push(PunchRecord::open(at));
    sort_history(history);
    Ok(PunchOutcome::Applied)
}

/// Close the open record at `at` and tabulate its duration.
pub fn punch_out(history: &mut [PunchRecord], at: DateTime<Utc>) -> Result<PunchOutcome, Divergence> {
    let at = at.trunc_subsecs(0);
    if history.iter().any(|r| r.time_out == Some(at)) {
        return Ok(PunchOutcome::AlreadyApplied);
    }

    let open = history
        .iter_mut()
        .rev()
        .find(|r| r.is_open())
        .ok_or(Divergence::NoOpenRecord)?;
    if at < open.time_in {
        return Err(Divergence::OutBeforeIn {
            at,
            time_in: open.time_in,
        });
    }

    open.close(at);
    Ok(PunchOutcome::Applied)
}

/// Status implied by the terminal record: open means `In`.
pub fn derive_status(history: &[PunchRecord]) -> BadgeStatus {
    match history.iter().max_by_key(|r| r.time_in) {
        Some(last) if last.is_open() => BadgeStatus::In,
        _ => BadgeStatus::Out,
    }
}

/// Reject a replacement history that holds more than one open record.
pub fn check_history(history: &[PunchRecord]) -> Result<(), Divergence> {
    let count = history.iter().filter(|r| r.is_open()).count();
    if count > 1 {
        return Err(Divergence::MultipleOpen { count });
    }
    Ok(())
}

pub fn sort_history(history: &mut [PunchRecord]) {
    history.sort_by_key(|r| r.time_in);
}

/// Recompute every record's duration from its stored times.
pub fn tabulate(history: &mut [PunchRecord]) {
    for record in history.iter_mut() {
        record.tabulate();
    }
}
