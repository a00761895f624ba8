//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Sleep between sweeps of the pending set
    pub check_interval: Duration,
    /// Maximum tasks processed in parallel within one sweep
    pub max_concurrent_tasks: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(5),
            max_concurrent_tasks: 4,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            check_interval: Duration::from_secs(
                std::env::var("WORKER_CHECK_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            max_concurrent_tasks: std::env::var("WORKER_MAX_CONCURRENT_TASKS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
        }
    }
}
