//! Roster merge for incoming `BadgeRosterSync` events.

use shared_types::{BadgeRoster, BadgeStatus};

/// Merge `incoming` into `local`, per badge and per field.
///
/// Present incoming fields win. `local_status` returns the status derived
/// from local history when there is any; that status is kept instead of the
/// incoming one. Returns the number of badges that changed.
pub fn merge_roster<F>(local: &mut BadgeRoster, incoming: BadgeRoster, local_status: F) -> usize
where
    F: Fn(&str) -> Option<BadgeStatus>,
{
    let mut changed = 0;
    for (number, theirs) in incoming {
        let derived = local_status(&number);
        let entry = local.entry(number).or_default();
        let before = entry.clone();

        if theirs.display_name.is_some() {
            entry.display_name = theirs.display_name;
        }
        if theirs.photo_url.is_some() {
            entry.photo_url = theirs.photo_url;
        }
        entry.status = derived.unwrap_or(theirs.status);

        if *entry != before {
            changed += 1;
        }
    }
    changed
}
