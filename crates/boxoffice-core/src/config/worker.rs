//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background task configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether background tasks run in this process.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between expiry sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// Maximum expired holds fetched per sweep page.
    #[serde(default = "default_sweep_batch")]
    pub sweep_batch_size: usize,
    /// Seconds between idle queue entry evictions.
    #[serde(default = "default_eviction_interval")]
    pub queue_eviction_interval_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval_seconds: default_sweep_interval(),
            sweep_batch_size: default_sweep_batch(),
            queue_eviction_interval_seconds: default_eviction_interval(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_sweep_batch() -> usize {
    500
}

fn default_eviction_interval() -> u64 {
    30
}
