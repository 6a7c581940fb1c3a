//! # Punch Propagation
//!
//! A punch on one node reaches its peers through the topic, and a node's
//! own events coming back are neither reapplied nor rebroadcast.

use std::time::Duration;

use shared_bus::Transport;
use shared_types::{BadgeStatus, EventKind, PunchRecord, SyncEvent};
use tc_02_punch_ledger::InMemoryRecordStore;

use super::harness::{at, wait_until, Group, GROUP};

#[tokio::test]
async fn test_punch_in_reaches_peer_without_backfill() {
    let mut group = Group::new();
    let east = group.spawn("east", InMemoryRecordStore::new()).await;
    let west = group.spawn("west", InMemoryRecordStore::new()).await;

    east.clock().punch_in_at("1001", at(8, 0)).unwrap();

    wait_until("west sees 1001 in", || {
        west.ledger().status("1001").unwrap() == BadgeStatus::In
    })
    .await;
    assert_eq!(west.ledger().history("1001").unwrap(), vec![PunchRecord::open(at(8, 0))]);
    assert!(group
        .observed()
        .await
        .iter()
        .all(|e| e.kind() != EventKind::BackfillRequest));

    east.shutdown().await;
    west.shutdown().await;
}

#[tokio::test]
async fn test_punch_out_closes_record_on_peer() {
    let mut group = Group::new();
    let east = group.spawn("east", InMemoryRecordStore::new()).await;
    let west = group.spawn("west", InMemoryRecordStore::new()).await;

    east.clock().punch_in_at("1001", at(8, 0)).unwrap();
    east.clock().punch_out_at("1001", at(16, 30)).unwrap();

    let expected = vec![PunchRecord::closed(at(8, 0), at(16, 30))];
    wait_until("west closes 1001", || west.ledger().history("1001").unwrap() == expected).await;
    assert_eq!(west.ledger().status("1001").unwrap(), BadgeStatus::Out);
    assert_eq!(expected[0].duration_seconds, Some(8 * 3600 + 30 * 60));

    east.shutdown().await;
    west.shutdown().await;
}

#[tokio::test]
async fn test_self_echo_is_not_reapplied_or_rebroadcast() {
    let mut group = Group::new();
    let mut config = group.config("east");
    config.sync.reconcile_interval = Duration::from_secs(3600);
    let east = group.start(config, InMemoryRecordStore::new()).await;
    let own = group.subscription("east");

    east.clock().punch_in_at("1001", at(8, 0)).unwrap();
    east.clock().punch_out_at("1001", at(12, 0)).unwrap();
    wait_until("both echoes consumed", || {
        east.outbox().is_empty()
            && group.broker.published_count() >= 2
            && group.broker.unsettled_count(&own) == 0
    })
    .await;

    // A late duplicate of the node's own punch-out.
    let echo = SyncEvent::punch_out("east", "1001", at(12, 0));
    group.broker.publish(GROUP, echo.encode().unwrap()).await.unwrap();
    wait_until("duplicate consumed", || group.broker.unsettled_count(&own) == 0).await;

    assert_eq!(
        east.ledger().history("1001").unwrap(),
        vec![PunchRecord::closed(at(8, 0), at(12, 0))]
    );
    assert!(east.outbox().is_empty());
    let punches: Vec<_> = group
        .observed()
        .await
        .into_iter()
        .map(|e| e.kind())
        .filter(|k| matches!(k, EventKind::PunchIn | EventKind::PunchOut))
        .collect();
    assert_eq!(punches, vec![EventKind::PunchIn, EventKind::PunchOut, EventKind::PunchOut]);

    east.shutdown().await;
}
