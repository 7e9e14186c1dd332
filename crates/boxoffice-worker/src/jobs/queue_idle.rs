//! Idle admission queue entry eviction.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use boxoffice_core::traits::Clock;
use boxoffice_queue::AdmissionQueue;

use crate::task::{PeriodicTask, TaskError};

/// Drops queue entries whose claimant stopped polling, so an abandoned
/// head cannot stall the line forever.
///
/// Only registered when `queue.idle_timeout_seconds` is non-zero.
#[derive(Debug)]
pub struct QueueIdleEvictor {
    queue: Arc<dyn AdmissionQueue>,
    clock: Arc<dyn Clock>,
    idle_timeout: Duration,
    interval: Duration,
}

impl QueueIdleEvictor {
    /// Create an evictor removing entries idle for longer than
    /// `idle_timeout`, checking every `interval`.
    pub fn new(
        queue: Arc<dyn AdmissionQueue>,
        clock: Arc<dyn Clock>,
        idle_timeout: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            queue,
            clock,
            idle_timeout,
            interval,
        }
    }

    /// Evict idle entries from every group. Returns how many were removed.
    pub async fn evict(&self) -> Result<usize, TaskError> {
        let idle = chrono::Duration::from_std(self.idle_timeout)
            .map_err(|e| TaskError::Permanent(format!("Invalid idle timeout: {e}")))?;
        let cutoff = self.clock.now() - idle;

        let groups = self
            .queue
            .groups()
            .await
            .map_err(|e| TaskError::Transient(format!("Failed to list queue groups: {e}")))?;

        let mut evicted = 0;
        for group in groups {
            match self.queue.evict_idle(group, cutoff).await {
                Ok(removed) => {
                    for claimant in &removed {
                        tracing::info!(
                            event_id = %group,
                            claimant = %claimant,
                            "Evicted idle queue entry"
                        );
                    }
                    evicted += removed.len();
                }
                Err(e) => {
                    tracing::warn!(event_id = %group, error = %e, "Queue eviction failed");
                }
            }
        }
        Ok(evicted)
    }
}

#[async_trait]
impl PeriodicTask for QueueIdleEvictor {
    fn name(&self) -> &str {
        "queue_idle_evictor"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run_once(&self) -> Result<Value, TaskError> {
        let evicted = self.evict().await?;
        Ok(serde_json::json!({ "evicted": evicted }))
    }
}
