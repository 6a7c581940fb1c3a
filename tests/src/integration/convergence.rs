//! # Anti-Entropy Convergence
//!
//! A node that never saw a badge's punches recovers them from a peer's
//! checksum announcement and one backfill round trip.

use std::time::Duration;

use shared_types::{Badge, BadgeRoster, BadgeStatus, EventKind, PunchRecord};
use tc_02_punch_ledger::InMemoryRecordStore;

use super::harness::{at, wait_until, Group};

fn seeded(badge: &str, history: Vec<PunchRecord>) -> InMemoryRecordStore {
    InMemoryRecordStore::new()
        .with_roster(BadgeRoster::from([(badge.to_string(), Badge::named("Grace"))]))
        .with_punches(badge, history)
}

#[tokio::test]
async fn test_missing_history_is_backfilled_with_one_request() {
    let mut group = Group::new();
    let history = vec![
        PunchRecord::closed(at(7, 45), at(11, 30)),
        PunchRecord::open(at(12, 15)),
    ];
    let east = group.spawn("east", seeded("2002", history.clone())).await;
    let west = group.spawn("west", InMemoryRecordStore::new()).await;

    wait_until("west converges", || west.ledger().history("2002").unwrap() == history).await;
    assert_eq!(west.ledger().status("2002").unwrap(), BadgeStatus::In);

    // Let further sweeps run; matching digests must not trigger more requests.
    tokio::time::sleep(Duration::from_millis(600)).await;
    let requests: Vec<_> = group
        .observed()
        .await
        .into_iter()
        .filter(|e| e.kind() == EventKind::BackfillRequest)
        .collect();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].is_from("west"));
    assert_eq!(requests[0].badge_number(), Some("2002"));
    assert_eq!(west.container().reconciler.pending_count(), 0);

    east.shutdown().await;
    west.shutdown().await;
}

#[tokio::test]
async fn test_history_sync_replaces_peer_history() {
    let mut group = Group::new();
    let east = group
        .spawn("east", seeded("3003", vec![PunchRecord::closed(at(8, 0), at(9, 0))]))
        .await;
    let west = group
        .spawn("west", seeded("3003", vec![PunchRecord::open(at(6, 0))]))
        .await;

    east.clock().share_history("3003").unwrap();

    let expected = vec![PunchRecord::closed(at(8, 0), at(9, 0))];
    wait_until("west takes east's history", || {
        west.ledger().history("3003").unwrap() == expected
    })
    .await;
    assert_eq!(west.ledger().status("3003").unwrap(), BadgeStatus::Out);

    east.shutdown().await;
    west.shutdown().await;
}

#[tokio::test]
async fn test_roster_registration_reaches_peer() {
    let mut group = Group::new();
    let east = group.spawn("east", InMemoryRecordStore::new()).await;
    let west = group.spawn("west", InMemoryRecordStore::new()).await;

    east.clock()
        .register_badge("4004", Some("Linus".into()), Some("linus.png".into()))
        .unwrap();

    wait_until("west learns 4004", || west.ledger().roster().unwrap().contains_key("4004")).await;
    let badge = &west.ledger().roster().unwrap()["4004"];
    assert_eq!(badge.display_name.as_deref(), Some("Linus"));
    assert_eq!(badge.photo_url.as_deref(), Some("linus.png"));

    east.shutdown().await;
    west.shutdown().await;
}
