//! Relay configuration.

use std::num::NonZeroUsize;
use std::thread::available_parallelism;
use std::time::Duration;

/// Bounded capacity of each partition lane.
pub const DEFAULT_LANE_CAPACITY: usize = 1_000;

/// Bounded capacity of the shared merge channel.
pub const MERGE_CAPACITY: usize = 1_000;

/// Tuning knobs for a [`crate::Relay`]. Treated as immutable once the relay
/// starts.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Number of partition lanes (and publish workers) per cycle.
    pub partitions: usize,
    /// Sleep between cycles.
    pub publish_delay: Duration,
    /// Upper bound on a single cycle; `None` disables the watchdog.
    pub cycle_timeout: Option<Duration>,
    /// Bounded capacity of each partition lane.
    pub lane_capacity: usize,
    /// Publish attempts per message before it is dropped from the cycle.
    pub publish_retry_attempts: u32,
    /// Fixed delay between publish attempts.
    pub publish_retry_delay: Duration,
    /// Drop messages instead of blocking when a lane is full. Trades
    /// at-least-once latency bounds for redelivery on the next cycle; leave
    /// off unless lane stalls are a measured problem.
    pub overflow_drop: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            partitions: available_parallelism().map_or(1, NonZeroUsize::get),
            publish_delay: Duration::from_secs(1),
            cycle_timeout: Some(Duration::from_secs(30)),
            lane_capacity: DEFAULT_LANE_CAPACITY,
            publish_retry_attempts: 3,
            publish_retry_delay: Duration::from_secs(1),
            overflow_drop: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_at_least_one_partition() {
        let config = RelayConfig::default();

        assert!(config.partitions >= 1);
        assert!(!config.overflow_drop);
        assert_eq!(config.publish_retry_attempts, 3);
    }
}
