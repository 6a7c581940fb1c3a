//! # Outbox Configuration

/// Default capacity, sized for a long transport outage at a busy clock.
pub const DEFAULT_CAPACITY: usize = 2048;

/// Outbox configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboxConfig {
    /// Maximum pending entries before `enqueue` reports saturation.
    pub capacity: usize,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl OutboxConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity }
    }
}
