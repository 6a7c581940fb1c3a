//! # Tri-Time Node
//!
//! Runs one time-clock node until Ctrl+C.
//!
//! ## Startup
//!
//! 1. Install logging (`RUST_LOG`, default `info`)
//! 2. Load configuration from `TRITIME_*` environment variables
//! 3. Open the flat-file record store under the data directory
//! 4. Start the node against an in-process broker
//!
//! The in-process broker and backfill hub make this a single-process group;
//! a deployment binds `Transport` and `BackfillChannel` to its own broker.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use node_runtime::{NodeConfig, NodeRuntime};
use shared_bus::{DirectChannelHub, InMemoryBroker};
use tc_02_punch_ledger::FlatFileRecordStore;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = NodeConfig::from_env().context("Failed to load configuration")?;

    let store = FlatFileRecordStore::open(&config.storage.data_dir).with_context(|| {
        format!(
            "Failed to open record store at {}",
            config.storage.data_dir.display()
        )
    })?;

    let broker = InMemoryBroker::new();
    broker.create_subscription(&config.subscription());

    let runtime = NodeRuntime::start(config, Arc::new(broker), DirectChannelHub::new(), store)
        .await
        .context("Failed to start node")?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
