//! # Runtime Lifecycle Tests
//!
//! Start and stop a single node against the in-process broker.

use std::sync::Arc;
use std::time::Duration;

use node_runtime::{NodeConfig, NodeRuntime, StartupError};
use shared_bus::{DirectChannelHub, InMemoryBroker, SubscriptionName, Transport, TransportError};
use shared_types::{EventKind, SyncEvent};
use tc_01_outbox::OutboxError;
use tc_02_punch_ledger::InMemoryRecordStore;
use tempfile::TempDir;

fn config(dir: &TempDir, system_id: &str) -> NodeConfig {
    let mut config = NodeConfig::for_testing(system_id);
    config.storage.data_dir = dir.path().to_path_buf();
    config
}

#[tokio::test]
async fn test_start_fails_without_subscription() {
    let dir = TempDir::new().unwrap();
    let broker = InMemoryBroker::new();

    let result = NodeRuntime::start(
        config(&dir, "east"),
        Arc::new(broker),
        DirectChannelHub::new(),
        InMemoryRecordStore::new(),
    )
    .await;

    assert!(matches!(
        result,
        Err(StartupError::Transport(TransportError::UnknownSubscription(_)))
    ));
}

#[tokio::test]
async fn test_start_fails_when_outbox_in_use() {
    let dir = TempDir::new().unwrap();
    let broker = InMemoryBroker::new();
    let config = config(&dir, "east");
    broker.create_subscription(&config.subscription());

    let first = NodeRuntime::start(
        config.clone(),
        Arc::new(broker.clone()),
        DirectChannelHub::new(),
        InMemoryRecordStore::new(),
    )
    .await
    .unwrap();

    let second = NodeRuntime::start(
        config,
        Arc::new(broker),
        DirectChannelHub::new(),
        InMemoryRecordStore::new(),
    )
    .await;
    assert!(matches!(
        second,
        Err(StartupError::Outbox(OutboxError::Locked { .. }))
    ));

    first.shutdown().await;
}

#[tokio::test]
async fn test_punch_is_published_and_echo_ignored() {
    let dir = TempDir::new().unwrap();
    let broker = InMemoryBroker::new();
    let config = config(&dir, "east");
    broker.create_subscription(&config.subscription());
    // A second subscription standing in for a peer.
    let peer = SubscriptionName::new("trisonics", "west");
    broker.create_subscription(&peer);

    let hub = DirectChannelHub::new();
    let runtime = NodeRuntime::start(
        config,
        Arc::new(broker.clone()),
        hub.clone(),
        InMemoryRecordStore::new(),
    )
    .await
    .unwrap();
    assert!(hub.is_registered("east"));

    runtime.clock().punch_in("1001").unwrap();

    let received = broker
        .receive(&peer, 10, Duration::from_secs(2))
        .await
        .unwrap();
    let event = SyncEvent::decode(&received[0].body).unwrap();
    assert_eq!(event.kind(), EventKind::PunchIn);
    assert!(event.is_from("east"));

    // The node's own copy is consumed without being applied twice.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while broker.unsettled_count(&runtime.container().config.subscription()) > 0 {
        assert!(tokio::time::Instant::now() < deadline, "self-echo never consumed");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(runtime.ledger().history("1001").unwrap().len(), 1);

    runtime.shutdown().await;
    assert!(!hub.is_registered("east"));
}

#[tokio::test]
async fn test_shutdown_keeps_unsent_events_for_next_start() {
    let dir = TempDir::new().unwrap();
    let broker = InMemoryBroker::new();
    let config = config(&dir, "east");
    broker.create_subscription(&config.subscription());

    let runtime = NodeRuntime::start(
        config.clone(),
        Arc::new(broker.clone()),
        DirectChannelHub::new(),
        InMemoryRecordStore::new(),
    )
    .await
    .unwrap();
    broker.set_available(false);
    runtime.clock().punch_in("1001").unwrap();
    runtime.shutdown().await;

    broker.set_available(true);
    let restarted = NodeRuntime::start(
        config,
        Arc::new(broker.clone()),
        DirectChannelHub::new(),
        InMemoryRecordStore::new(),
    )
    .await
    .unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while broker.published_count() == 0 {
        assert!(tokio::time::Instant::now() < deadline, "reloaded event never published");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    restarted.shutdown().await;
}
