//! Backend dispatcher for admission queues.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use boxoffice_cache::RedisClient;
use boxoffice_core::config::{QueueBackend, QueueConfig};
use boxoffice_core::error::AppError;
use boxoffice_core::result::AppResult;
use boxoffice_core::traits::Clock;
use boxoffice_core::types::{ClaimantId, EventId};
use boxoffice_entity::queue::{AdmissionOutcome, JoinReceipt, QueuePosition};

use crate::memory::MemoryAdmissionQueue;
use crate::queue::AdmissionQueue;
use crate::redis::RedisAdmissionQueue;

/// Dispatcher over the admission queue backends.
#[derive(Debug)]
pub enum AdmissionQueueDispatch {
    /// In-memory queue (single node).
    Memory(MemoryAdmissionQueue),
    /// Redis queue (multi-node).
    Redis(RedisAdmissionQueue),
}

impl AdmissionQueueDispatch {
    /// Build the configured backend.
    pub fn from_config(
        config: &QueueConfig,
        redis: Option<RedisClient>,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        let track_activity = config.idle_timeout().is_some();
        let queue = match config.backend {
            QueueBackend::Memory => Self::Memory(MemoryAdmissionQueue::new(clock, track_activity)),
            QueueBackend::Redis => {
                let client = redis.ok_or_else(|| {
                    AppError::configuration("Redis queue backend requires a Redis client")
                })?;
                Self::Redis(RedisAdmissionQueue::new(client, clock, track_activity))
            }
        };
        info!(
            backend = queue.backend_name(),
            idle_eviction = track_activity,
            "Admission queue initialized"
        );
        Ok(queue)
    }

    /// Short backend name for logs and health output.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Redis(_) => "redis",
        }
    }
}

#[async_trait]
impl AdmissionQueue for AdmissionQueueDispatch {
    async fn join(&self, group: EventId, claimant: &ClaimantId) -> AppResult<JoinReceipt> {
        match self {
            Self::Memory(inner) => inner.join(group, claimant).await,
            Self::Redis(inner) => inner.join(group, claimant).await,
        }
    }

    async fn position(&self, group: EventId, claimant: &ClaimantId) -> AppResult<QueuePosition> {
        match self {
            Self::Memory(inner) => inner.position(group, claimant).await,
            Self::Redis(inner) => inner.position(group, claimant).await,
        }
    }

    async fn admit_if_head(
        &self,
        group: EventId,
        claimant: &ClaimantId,
    ) -> AppResult<AdmissionOutcome> {
        match self {
            Self::Memory(inner) => inner.admit_if_head(group, claimant).await,
            Self::Redis(inner) => inner.admit_if_head(group, claimant).await,
        }
    }

    async fn leave(&self, group: EventId, claimant: &ClaimantId) -> AppResult<bool> {
        match self {
            Self::Memory(inner) => inner.leave(group, claimant).await,
            Self::Redis(inner) => inner.leave(group, claimant).await,
        }
    }

    async fn evict_idle(&self, group: EventId, cutoff: DateTime<Utc>) -> AppResult<Vec<ClaimantId>> {
        match self {
            Self::Memory(inner) => inner.evict_idle(group, cutoff).await,
            Self::Redis(inner) => inner.evict_idle(group, cutoff).await,
        }
    }

    async fn groups(&self) -> AppResult<Vec<EventId>> {
        match self {
            Self::Memory(inner) => inner.groups().await,
            Self::Redis(inner) => inner.groups().await,
        }
    }

    async fn health_check(&self) -> AppResult<()> {
        match self {
            Self::Memory(inner) => inner.health_check().await,
            Self::Redis(inner) => inner.health_check().await,
        }
    }
}
