//! # Outbox Durability
//!
//! Saturation while the transport is down, recovery once it returns, and
//! unsent events surviving a restart.

use std::sync::Arc;
use std::time::Duration;

use node_runtime::wiring::Publisher;
use node_runtime::{SyncError, TimeClock};
use shared_bus::InMemoryBroker;
use shared_types::{BadgeStatus, EventKind};
use tc_01_outbox::{JsonFileSnapshotStore, Outbox, OutboxConfig};
use tc_02_punch_ledger::{InMemoryRecordStore, PunchLedger};
use tempfile::TempDir;

use super::harness::{at, wait_until, Group, GROUP};

#[tokio::test]
async fn test_saturation_and_recovery() {
    let dir = TempDir::new().unwrap();
    let broker = InMemoryBroker::new();
    let outbox = Arc::new(
        Outbox::open(
            OutboxConfig::with_capacity(2),
            JsonFileSnapshotStore::open(dir.path()).unwrap(),
        )
        .unwrap(),
    );
    let ledger = Arc::new(PunchLedger::new(InMemoryRecordStore::new()));
    let clock = TimeClock::new("east", ledger.clone(), outbox.clone());
    let publisher = Publisher::new(
        outbox.clone(),
        Arc::new(broker.clone()),
        GROUP,
        1,
        Duration::from_millis(50),
    );

    broker.set_available(false);
    clock.punch_in_at("1001", at(8, 0)).unwrap();
    clock.punch_in_at("2002", at(8, 5)).unwrap();
    assert!(matches!(
        clock.punch_in_at("3003", at(8, 10)),
        Err(SyncError::QueueSaturated { capacity: 2 })
    ));
    // The local punch stands even though peers were not told.
    assert_eq!(ledger.status("3003").unwrap(), BadgeStatus::In);

    assert_eq!(publisher.publish_pending().await.requeued, 1);
    assert_eq!(outbox.len(), 2);

    broker.set_available(true);
    assert_eq!(publisher.publish_pending().await.sent, 1);
    clock.punch_out_at("1001", at(12, 0)).unwrap();
    assert_eq!(outbox.len(), 2);
}

#[tokio::test]
async fn test_unsent_events_survive_restart() {
    let mut group = Group::new();
    let config = group.config("east");

    let east = group.start(config.clone(), InMemoryRecordStore::new()).await;
    group.broker.set_available(false);
    east.clock().punch_in_at("1001", at(8, 0)).unwrap();
    east.clock().punch_out_at("1001", at(9, 0)).unwrap();
    east.shutdown().await;

    group.broker.set_available(true);
    let west = group.spawn("west", InMemoryRecordStore::new()).await;
    let east = group.start(config, InMemoryRecordStore::new()).await;

    wait_until("west replays east's punches", || {
        west.ledger().history("1001").unwrap().len() == 1
            && west.ledger().status("1001").unwrap() == BadgeStatus::Out
    })
    .await;
    let kinds: Vec<_> = group
        .observed()
        .await
        .into_iter()
        .filter(|e| e.is_from("east"))
        .map(|e| e.kind())
        .filter(|k| matches!(k, EventKind::PunchIn | EventKind::PunchOut))
        .collect();
    assert_eq!(kinds, vec![EventKind::PunchIn, EventKind::PunchOut]);

    east.shutdown().await;
    west.shutdown().await;
}
