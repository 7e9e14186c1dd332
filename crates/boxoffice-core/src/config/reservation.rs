//! Reservation manager configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which store backs resource and hold state.
///
/// Exactly one backend is active per process, so the row-lock and the
/// keyed-store atomicity mechanisms never act on the same resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationBackend {
    /// In-process state guarded by per-resource mutexes.
    #[default]
    Memory,
    /// PostgreSQL with `SELECT ... FOR UPDATE` row locking.
    Postgres,
    /// Redis with versioned compare-and-set scripts.
    Redis,
}

/// Reservation (hold) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationConfig {
    /// Store backend.
    #[serde(default)]
    pub backend: ReservationBackend,
    /// TTL applied when a claim does not specify one.
    #[serde(default = "default_ttl")]
    pub default_ttl_seconds: u64,
    /// Upper bound for a requested TTL.
    #[serde(default = "default_max_ttl")]
    pub max_ttl_seconds: u64,
    /// Compare-and-set attempts before the Redis store reports contention
    /// as `StoreUnavailable`.
    #[serde(default = "default_redis_max_retries")]
    pub redis_max_retries: u32,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            backend: ReservationBackend::default(),
            default_ttl_seconds: default_ttl(),
            max_ttl_seconds: default_max_ttl(),
            redis_max_retries: default_redis_max_retries(),
        }
    }
}

impl ReservationConfig {
    /// Default hold TTL.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    /// Maximum hold TTL.
    pub fn max_ttl(&self) -> Duration {
        Duration::from_secs(self.max_ttl_seconds)
    }
}

fn default_ttl() -> u64 {
    600
}

fn default_max_ttl() -> u64 {
    3600
}

fn default_redis_max_retries() -> u32 {
    16
}
