//! Reservation state stores.

pub mod dispatch;
pub mod memory;
pub mod postgres;
pub mod redis;
pub mod slot;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use boxoffice_core::result::AppResult;
use boxoffice_core::types::{EventId, HoldId, ResourceId};
use boxoffice_entity::hold::Hold;
use boxoffice_entity::resource::Resource;

pub use dispatch::ReservationStoreDispatch;
pub use memory::MemoryReservationStore;
pub use postgres::PostgresReservationStore;
pub use self::redis::RedisReservationStore;
pub use slot::Slot;

/// Durable, atomically updatable resource and hold state.
///
/// Implementations must be thread-safe. Updates to one resource are
/// linearizable; updates to different resources may run in parallel.
#[async_trait]
pub trait ReservationStore: Send + Sync + std::fmt::Debug {
    /// Persist freshly registered resources.
    async fn register_resources(&self, resources: &[Resource]) -> AppResult<()>;

    /// Look up one resource.
    async fn get_resource(&self, id: ResourceId) -> AppResult<Option<Resource>>;

    /// All resources of an event, in registration order.
    async fn list_resources(&self, event_id: EventId) -> AppResult<Vec<Resource>>;

    /// Look up one hold, in any status.
    async fn get_hold(&self, id: HoldId) -> AppResult<Option<Hold>>;

    /// Atomically read-modify-write one resource and its active hold.
    ///
    /// `apply` receives the current [`Slot`]; whatever it changes is
    /// persisted as one unit once it returns. It may be invoked more than
    /// once when the store retries after a conflicting writer, so it must
    /// recompute everything from the slot it is given. Fails with
    /// `NotFound` for an unknown resource.
    async fn update_slot(
        &self,
        resource_id: ResourceId,
        apply: &mut (dyn for<'s> FnMut(&'s mut Slot) + Send),
    ) -> AppResult<Slot>;

    /// Up to `limit` active holds whose expiry is at or before `now`,
    /// soonest-expired first. Holds listed in `exclude` are passed over.
    async fn find_expired_holds(
        &self,
        now: DateTime<Utc>,
        exclude: &[HoldId],
        limit: usize,
    ) -> AppResult<Vec<Hold>>;

    /// Check that the backing store is reachable.
    async fn health_check(&self) -> AppResult<()>;
}
