//! Backend dispatcher for reservation stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use boxoffice_cache::RedisClient;
use boxoffice_core::config::{ReservationBackend, ReservationConfig};
use boxoffice_core::error::AppError;
use boxoffice_core::result::AppResult;
use boxoffice_core::types::{EventId, HoldId, ResourceId};
use boxoffice_database::DatabasePool;
use boxoffice_entity::hold::Hold;
use boxoffice_entity::resource::Resource;

use super::{
    MemoryReservationStore, PostgresReservationStore, RedisReservationStore, ReservationStore,
    Slot,
};

/// Dispatcher over the reservation store backends.
///
/// Exactly one backend is chosen per process from configuration.
#[derive(Debug)]
pub enum ReservationStoreDispatch {
    /// In-memory store (single node).
    Memory(MemoryReservationStore),
    /// PostgreSQL row-locking store.
    Postgres(PostgresReservationStore),
    /// Redis compare-and-set store (multi-node).
    Redis(RedisReservationStore),
}

impl ReservationStoreDispatch {
    /// Build the configured backend from the connections that were opened
    /// for it.
    pub fn from_config(
        config: &ReservationConfig,
        db: Option<DatabasePool>,
        redis: Option<RedisClient>,
    ) -> AppResult<Self> {
        let store = match config.backend {
            ReservationBackend::Memory => Self::Memory(MemoryReservationStore::new()),
            ReservationBackend::Postgres => {
                let db = db.ok_or_else(|| {
                    AppError::configuration("Postgres reservation backend requires a database")
                })?;
                Self::Postgres(PostgresReservationStore::new(db))
            }
            ReservationBackend::Redis => {
                let client = redis.ok_or_else(|| {
                    AppError::configuration("Redis reservation backend requires a Redis client")
                })?;
                Self::Redis(RedisReservationStore::new(client, config.redis_max_retries))
            }
        };
        info!(backend = store.backend_name(), "Reservation store initialized");
        Ok(store)
    }

    /// Short backend name for logs and health output.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
            Self::Redis(_) => "redis",
        }
    }
}

#[async_trait]
impl ReservationStore for ReservationStoreDispatch {
    async fn register_resources(&self, resources: &[Resource]) -> AppResult<()> {
        match self {
            Self::Memory(inner) => inner.register_resources(resources).await,
            Self::Postgres(inner) => inner.register_resources(resources).await,
            Self::Redis(inner) => inner.register_resources(resources).await,
        }
    }

    async fn get_resource(&self, id: ResourceId) -> AppResult<Option<Resource>> {
        match self {
            Self::Memory(inner) => inner.get_resource(id).await,
            Self::Postgres(inner) => inner.get_resource(id).await,
            Self::Redis(inner) => inner.get_resource(id).await,
        }
    }

    async fn list_resources(&self, event_id: EventId) -> AppResult<Vec<Resource>> {
        match self {
            Self::Memory(inner) => inner.list_resources(event_id).await,
            Self::Postgres(inner) => inner.list_resources(event_id).await,
            Self::Redis(inner) => inner.list_resources(event_id).await,
        }
    }

    async fn get_hold(&self, id: HoldId) -> AppResult<Option<Hold>> {
        match self {
            Self::Memory(inner) => inner.get_hold(id).await,
            Self::Postgres(inner) => inner.get_hold(id).await,
            Self::Redis(inner) => inner.get_hold(id).await,
        }
    }

    async fn update_slot(
        &self,
        resource_id: ResourceId,
        apply: &mut (dyn for<'s> FnMut(&'s mut Slot) + Send),
    ) -> AppResult<Slot> {
        match self {
            Self::Memory(inner) => inner.update_slot(resource_id, apply).await,
            Self::Postgres(inner) => inner.update_slot(resource_id, apply).await,
            Self::Redis(inner) => inner.update_slot(resource_id, apply).await,
        }
    }

    async fn find_expired_holds(
        &self,
        now: DateTime<Utc>,
        exclude: &[HoldId],
        limit: usize,
    ) -> AppResult<Vec<Hold>> {
        match self {
            Self::Memory(inner) => inner.find_expired_holds(now, exclude, limit).await,
            Self::Postgres(inner) => inner.find_expired_holds(now, exclude, limit).await,
            Self::Redis(inner) => inner.find_expired_holds(now, exclude, limit).await,
        }
    }

    async fn health_check(&self) -> AppResult<()> {
        match self {
            Self::Memory(inner) => inner.health_check().await,
            Self::Postgres(inner) => inner.health_check().await,
            Self::Redis(inner) => inner.health_check().await,
        }
    }
}
