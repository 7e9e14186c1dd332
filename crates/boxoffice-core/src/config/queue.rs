//! Admission queue configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which store backs the admission queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    /// In-process ordered sets behind a mutex per group.
    #[default]
    Memory,
    /// Redis sorted sets with Lua scripts.
    Redis,
}

/// Admission queue settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Queue backend.
    #[serde(default)]
    pub backend: QueueBackend,
    /// Evict entries not seen (join/position) for this many seconds.
    /// `0` disables eviction, so an abandoned head blocks the queue.
    #[serde(default)]
    pub idle_timeout_seconds: u64,
}

impl QueueConfig {
    /// Idle timeout, if eviction is enabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_seconds > 0).then(|| Duration::from_secs(self.idle_timeout_seconds))
    }
}
