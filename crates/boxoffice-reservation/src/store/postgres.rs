//! PostgreSQL reservation store using row-level locking.
//!
//! Every slot update runs in one transaction that takes `FOR UPDATE` on the
//! resource row before reading its active hold, so concurrent updates of
//! the same resource serialize on the row lock while different resources
//! proceed in parallel. A partial unique index on `holds(resource_id)
//! WHERE status = 'active'` backs the one-active-hold invariant.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use boxoffice_core::error::{AppError, ErrorKind};
use boxoffice_core::result::AppResult;
use boxoffice_core::types::{EventId, HoldId, ResourceId};
use boxoffice_database::DatabasePool;
use boxoffice_database::repositories::{HoldRepository, ResourceRepository};
use boxoffice_entity::hold::Hold;
use boxoffice_entity::resource::Resource;

use super::{ReservationStore, Slot};

/// PostgreSQL-backed reservation store.
#[derive(Debug, Clone)]
pub struct PostgresReservationStore {
    db: DatabasePool,
    resources: ResourceRepository,
    holds: HoldRepository,
}

impl PostgresReservationStore {
    /// Create a store over an established pool.
    pub fn new(db: DatabasePool) -> Self {
        let pool = db.pool().clone();
        Self {
            db,
            resources: ResourceRepository::new(pool.clone()),
            holds: HoldRepository::new(pool),
        }
    }
}

#[async_trait]
impl ReservationStore for PostgresReservationStore {
    async fn register_resources(&self, resources: &[Resource]) -> AppResult<()> {
        self.resources.insert_many(resources).await
    }

    async fn get_resource(&self, id: ResourceId) -> AppResult<Option<Resource>> {
        self.resources.find_by_id(id).await
    }

    async fn list_resources(&self, event_id: EventId) -> AppResult<Vec<Resource>> {
        self.resources.find_by_event(event_id).await
    }

    async fn get_hold(&self, id: HoldId) -> AppResult<Option<Hold>> {
        self.holds.find_by_id(id).await
    }

    async fn update_slot(
        &self,
        resource_id: ResourceId,
        apply: &mut (dyn for<'s> FnMut(&'s mut Slot) + Send),
    ) -> AppResult<Slot> {
        let mut tx = self.db.pool().begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::StoreUnavailable, "Failed to begin transaction", e)
        })?;

        // Dropping `tx` on any early return rolls back and releases the lock.
        let resource = ResourceRepository::lock_for_update(&mut tx, resource_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Resource {resource_id} not found")))?;
        let active = HoldRepository::find_active_for_resource(&mut tx, resource_id).await?;

        let mut slot = Slot::new(resource, active);
        apply(&mut slot);

        if !slot.is_dirty() {
            tx.rollback().await.map_err(|e| {
                AppError::with_source(ErrorKind::StoreUnavailable, "Failed to end transaction", e)
            })?;
            return Ok(slot);
        }

        // Closed holds are written before new ones so the partial unique
        // index never sees two active rows.
        for hold in slot.written_holds() {
            HoldRepository::upsert(&mut tx, hold).await?;
        }
        ResourceRepository::update_status(&mut tx, slot.resource()).await?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::StoreUnavailable, "Failed to commit slot update", e)
        })?;

        debug!(
            resource_id = %resource_id,
            status = %slot.resource().status,
            holds_written = slot.written_holds().len(),
            "Slot updated"
        );
        Ok(slot)
    }

    async fn find_expired_holds(
        &self,
        now: DateTime<Utc>,
        exclude: &[HoldId],
        limit: usize,
    ) -> AppResult<Vec<Hold>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.holds.find_expired(now, exclude, limit).await
    }

    async fn health_check(&self) -> AppResult<()> {
        self.db.ping().await
    }
}
