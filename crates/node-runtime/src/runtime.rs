//! # Node Runtime
//!
//! Owns one running node: its subsystems and the three task loops.
//!
//! ## Startup Sequence
//!
//! 1. Validate configuration
//! 2. Open (and lock) the outbox, reloading anything left from a previous run
//! 3. Confirm the node's subscription is reachable
//! 4. Initialize subsystems in dependency order
//! 5. Register this node's backfill sink
//! 6. Spawn publisher, subscriber and reconcile timer
//!
//! Any failure before step 6 is a [`StartupError`]; once running, no error
//! ends a task. Only [`NodeRuntime::shutdown`] does.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use shared_bus::{DirectChannelHub, Transport};
use tc_01_outbox::{JsonFileSnapshotStore, Outbox};
use tc_02_punch_ledger::{PunchLedger, RecordStore};

use crate::clock::TimeClock;
use crate::container::{NodeConfig, SubsystemContainer};
use crate::errors::StartupError;
use crate::wiring::{Backoff, Publisher, ReconcileTimer, Subscriber};

/// Outbox entries moved per publish pass.
pub const PUBLISH_BATCH: usize = 32;

/// Handle to a running node.
pub struct NodeRuntime {
    container: Arc<SubsystemContainer>,
    hub: DirectChannelHub,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl NodeRuntime {
    /// Start a node with its outbox stored under `<data_dir>/outbox`.
    pub async fn start(
        config: NodeConfig,
        transport: Arc<dyn Transport>,
        hub: DirectChannelHub,
        store: impl RecordStore + 'static,
    ) -> Result<Self, StartupError> {
        config.validate()?;
        let snapshots = JsonFileSnapshotStore::open(config.storage.outbox_dir())?;
        let outbox = Outbox::open(config.outbox_config(), snapshots)?;
        Self::start_with_outbox(config, transport, hub, outbox, store).await
    }

    /// Start a node around an already-opened outbox.
    pub async fn start_with_outbox(
        config: NodeConfig,
        transport: Arc<dyn Transport>,
        hub: DirectChannelHub,
        outbox: Outbox,
        store: impl RecordStore + 'static,
    ) -> Result<Self, StartupError> {
        config.validate()?;

        let subscription = config.subscription();
        transport.check_subscription(&subscription).await?;

        info!("===========================================");
        info!("  Tri-Time Node {}", config.identity.system_id);
        info!("===========================================");

        let container = Arc::new(SubsystemContainer::new(config, outbox, store, Arc::new(hub.clone())));
        let system_id = container.system_id().to_string();
        hub.register(system_id.clone(), container.backfill_sink());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let cfg = &container.config;

        let publisher = Publisher::new(
            Arc::clone(&container.outbox),
            Arc::clone(&transport),
            cfg.transport.group.clone(),
            PUBLISH_BATCH,
            cfg.sync.publish_interval,
        );
        let subscriber = Subscriber::new(
            system_id.clone(),
            Arc::clone(&transport),
            subscription,
            Arc::clone(&container.inbound),
            cfg.transport.receive_batch,
            cfg.transport.receive_wait,
            Backoff::new(cfg.sync.backoff_initial, cfg.sync.backoff_max),
        );
        let timer = ReconcileTimer::new(Arc::clone(&container.reconciler), cfg.sync.reconcile_interval);

        let tasks = vec![
            ("publisher", tokio::spawn(publisher.run(shutdown_rx.clone()))),
            ("subscriber", tokio::spawn(subscriber.run(shutdown_rx.clone()))),
            ("reconciler", tokio::spawn(timer.run(shutdown_rx))),
        ];

        info!(
            system_id = %system_id,
            topic = %cfg.transport.group,
            pending = container.outbox.len(),
            data_dir = %cfg.storage.data_dir.display(),
            "Node running"
        );

        Ok(Self {
            container,
            hub,
            shutdown_tx,
            tasks,
        })
    }

    /// Stop every task, persist the outbox and leave the backfill hub.
    pub async fn shutdown(self) {
        info!(system_id = %self.system_id(), "Initiating graceful shutdown...");

        self.shutdown_tx.send_replace(true);
        for (name, task) in self.tasks {
            if let Err(e) = task.await {
                error!(task = name, error = %e, "Task ended abnormally");
            }
        }

        if let Err(e) = self.container.outbox.persist() {
            error!(error = %e, "Failed to persist outbox on shutdown");
        }
        self.hub.unregister(self.container.system_id());

        info!(pending = self.container.outbox.len(), "Shutdown complete");
    }

    pub fn system_id(&self) -> &str {
        self.container.system_id()
    }

    pub fn container(&self) -> Arc<SubsystemContainer> {
        Arc::clone(&self.container)
    }

    pub fn clock(&self) -> &TimeClock {
        &self.container.clock
    }

    pub fn ledger(&self) -> &PunchLedger {
        &self.container.ledger
    }

    pub fn outbox(&self) -> &Outbox {
        &self.container.outbox
    }
}
