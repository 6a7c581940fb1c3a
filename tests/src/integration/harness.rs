//! A group of nodes sharing one in-memory broker and backfill hub.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use node_runtime::{NodeConfig, NodeRuntime};
use shared_bus::{DirectChannelHub, InMemoryBroker, SubscriptionName, Transport};
use shared_types::SyncEvent;
use tc_02_punch_ledger::InMemoryRecordStore;
use tempfile::TempDir;

pub const GROUP: &str = "trisonics";

pub struct Group {
    pub broker: InMemoryBroker,
    pub hub: DirectChannelHub,
    /// Extra subscription that records every event on the topic.
    observer: SubscriptionName,
    dirs: Vec<TempDir>,
}

impl Group {
    pub fn new() -> Self {
        let broker = InMemoryBroker::new();
        let observer = SubscriptionName::new(GROUP, "observer");
        broker.create_subscription(&observer);
        Self {
            broker,
            hub: DirectChannelHub::new(),
            observer,
            dirs: Vec::new(),
        }
    }

    /// Test config for `system_id` with its own data directory.
    pub fn config(&mut self, system_id: &str) -> NodeConfig {
        let dir = TempDir::new().unwrap();
        let mut config = NodeConfig::for_testing(system_id);
        config.storage.data_dir = dir.path().to_path_buf();
        self.dirs.push(dir);
        config
    }

    pub async fn start(&self, config: NodeConfig, store: InMemoryRecordStore) -> NodeRuntime {
        self.broker.create_subscription(&config.subscription());
        NodeRuntime::start(config, Arc::new(self.broker.clone()), self.hub.clone(), store)
            .await
            .unwrap()
    }

    pub async fn spawn(&mut self, system_id: &str, store: InMemoryRecordStore) -> NodeRuntime {
        let config = self.config(system_id);
        self.start(config, store).await
    }

    pub fn subscription(&self, system_id: &str) -> SubscriptionName {
        SubscriptionName::new(GROUP, system_id)
    }

    /// Every event published since the last call.
    pub async fn observed(&self) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        loop {
            let batch = self
                .broker
                .receive(&self.observer, 100, Duration::from_millis(20))
                .await
                .unwrap();
            if batch.is_empty() {
                return events;
            }
            for delivery in batch {
                events.push(SyncEvent::decode(&delivery.body).unwrap());
                self.broker.acknowledge(&delivery).await.unwrap();
            }
        }
    }
}

/// Poll `condition` until it holds, failing after five seconds.
pub async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, 4, hour, minute, 0).unwrap()
}
