//! Change notifier configuration.

use serde::{Deserialize, Serialize};

/// Real-time change stream configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Bounded buffer per subscriber; updates beyond it are dropped.
    #[serde(default = "default_buffer")]
    pub subscriber_buffer_size: usize,
    /// Interval between keep-alive comments on the event stream.
    #[serde(default = "default_keep_alive")]
    pub keep_alive_seconds: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer_size: default_buffer(),
            keep_alive_seconds: default_keep_alive(),
        }
    }
}

fn default_buffer() -> usize {
    64
}

fn default_keep_alive() -> u64 {
    15
}
