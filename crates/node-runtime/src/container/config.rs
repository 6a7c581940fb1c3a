//! # Node Configuration
//!
//! Unified configuration for all subsystems and runtime parameters.
//!
//! ## Environment
//!
//! | Variable | Default |
//! |----------|---------|
//! | `TRITIME_SYS_ID` | required |
//! | `TRITIME_GROUP` | `trisonics` |
//! | `TRITIME_DATA_DIR` | `./data` |
//! | `TRITIME_OUTBOX_CAPACITY` | 2048 |
//! | `TRITIME_PUBLISH_INTERVAL_SECS` | 10 |
//! | `TRITIME_RECONCILE_INTERVAL_SECS` | 300 |
//! | `TRITIME_RECEIVE_BATCH` | 10 |
//! | `TRITIME_RECEIVE_WAIT_SECS` | 5 |

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use shared_bus::SubscriptionName;
use tc_01_outbox::config::DEFAULT_CAPACITY;
use tc_01_outbox::OutboxConfig;
use tc_03_anti_entropy::config::DEFAULT_BACKFILL_TTL;
use tc_03_anti_entropy::AntiEntropyConfig;

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Who this node is.
    pub identity: IdentityConfig,
    /// Topic and receive parameters.
    pub transport: TransportConfig,
    /// Outbox sizing.
    pub outbox: OutboxSection,
    /// Publish and reconciliation timing.
    pub sync: SyncConfig,
    /// Where local data lives.
    pub storage: StorageConfig,
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },

    /// The system id is empty.
    #[error("System id must not be empty")]
    EmptySystemId,

    /// Outbox capacity is zero.
    #[error("Outbox capacity must be at least 1")]
    ZeroCapacity,

    /// Receive batch size is zero.
    #[error("Receive batch size must be at least 1")]
    ZeroBatch,
}

impl NodeConfig {
    /// Load from `TRITIME_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = NodeConfig::default();

        config.identity.system_id = lookup("TRITIME_SYS_ID").ok_or(ConfigError::Missing("TRITIME_SYS_ID"))?;
        if let Some(group) = lookup("TRITIME_GROUP") {
            config.transport.group = group;
        }
        if let Some(dir) = lookup("TRITIME_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(capacity) = parse(&lookup, "TRITIME_OUTBOX_CAPACITY")? {
            config.outbox.capacity = capacity;
        }
        if let Some(secs) = parse(&lookup, "TRITIME_PUBLISH_INTERVAL_SECS")? {
            config.sync.publish_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse(&lookup, "TRITIME_RECONCILE_INTERVAL_SECS")? {
            config.sync.reconcile_interval = Duration::from_secs(secs);
        }
        if let Some(batch) = parse(&lookup, "TRITIME_RECEIVE_BATCH")? {
            config.transport.receive_batch = batch;
        }
        if let Some(secs) = parse(&lookup, "TRITIME_RECEIVE_WAIT_SECS")? {
            config.transport.receive_wait = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings a node cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.system_id.trim().is_empty() {
            return Err(ConfigError::EmptySystemId);
        }
        if self.outbox.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.transport.receive_batch == 0 {
            return Err(ConfigError::ZeroBatch);
        }
        Ok(())
    }

    /// Fast timings for in-process multi-node tests.
    pub fn for_testing(system_id: impl Into<String>) -> Self {
        Self {
            identity: IdentityConfig {
                system_id: system_id.into(),
            },
            transport: TransportConfig {
                receive_wait: Duration::from_millis(50),
                ..TransportConfig::default()
            },
            outbox: OutboxSection::default(),
            sync: SyncConfig {
                publish_interval: Duration::from_millis(50),
                reconcile_interval: Duration::from_millis(200),
                backfill_ttl: Duration::from_secs(5),
                backoff_initial: Duration::from_millis(10),
                backoff_max: Duration::from_millis(100),
            },
            storage: StorageConfig::default(),
        }
    }

    /// This node's subscription on the group topic.
    pub fn subscription(&self) -> SubscriptionName {
        SubscriptionName::new(&self.transport.group, &self.identity.system_id)
    }

    pub fn outbox_config(&self) -> OutboxConfig {
        OutboxConfig::with_capacity(self.outbox.capacity)
    }

    pub fn anti_entropy_config(&self) -> AntiEntropyConfig {
        AntiEntropyConfig {
            backfill_ttl: self.sync.backfill_ttl,
        }
    }
}

fn parse<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

/// Node identity.
#[derive(Debug, Clone, Default)]
pub struct IdentityConfig {
    /// Unique id of this node within its group.
    pub system_id: String,
}

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Topic shared by every node of the group.
    pub group: String,
    /// Maximum messages per receive.
    pub receive_batch: usize,
    /// Longest a receive waits for the first message.
    pub receive_wait: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            group: "trisonics".to_string(),
            receive_batch: 10,
            receive_wait: Duration::from_secs(5),
        }
    }
}

/// Outbox configuration.
#[derive(Debug, Clone)]
pub struct OutboxSection {
    pub capacity: usize,
}

impl Default for OutboxSection {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Publish and reconciliation timing.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Longest the publisher idles when nothing is enqueued.
    pub publish_interval: Duration,
    /// Period of the checksum sweep.
    pub reconcile_interval: Duration,
    /// Lifetime of an unanswered backfill request.
    pub backfill_ttl: Duration,
    /// First delay after a failed receive.
    pub backoff_initial: Duration,
    /// Cap on the receive retry delay.
    pub backoff_max: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            publish_interval: Duration::from_secs(10),
            reconcile_interval: Duration::from_secs(300),
            backfill_ttl: DEFAULT_BACKFILL_TTL,
            backoff_initial: Duration::from_millis(500),
            backoff_max: Duration::from_secs(30),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Holds `outbox/`, `badges.json` and the punch files.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl StorageConfig {
    pub fn outbox_dir(&self) -> PathBuf {
        self.data_dir.join("outbox")
    }
}
