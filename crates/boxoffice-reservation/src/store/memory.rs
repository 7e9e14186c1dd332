//! In-memory reservation store using per-resource Tokio mutexes for
//! single-node deployments.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use boxoffice_core::error::AppError;
use boxoffice_core::result::AppResult;
use boxoffice_core::types::{EventId, HoldId, ResourceId};
use boxoffice_entity::hold::Hold;
use boxoffice_entity::resource::Resource;

use super::{ReservationStore, Slot};

/// Active holds ordered by expiry.
type ExpiryIndex = BTreeSet<(DateTime<Utc>, HoldId)>;

/// Persisted state of one resource.
#[derive(Debug)]
struct SlotState {
    resource: Resource,
    active: Option<Hold>,
}

/// In-memory reservation store.
///
/// Each resource has its own mutex, so claims on different resources never
/// contend. Holds are kept forever for lookup, mirroring the durable stores;
/// only active holds are indexed by expiry, so a sweep never walks closed
/// ones.
#[derive(Debug, Default)]
pub struct MemoryReservationStore {
    slots: DashMap<ResourceId, Arc<Mutex<SlotState>>>,
    holds: DashMap<HoldId, Hold>,
    events: DashMap<EventId, Vec<ResourceId>>,
    expiry: StdMutex<ExpiryIndex>,
}

impl MemoryReservationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_cell(&self, id: ResourceId) -> Option<Arc<Mutex<SlotState>>> {
        self.slots.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    fn expiry_index(&self) -> AppResult<MutexGuard<'_, ExpiryIndex>> {
        self.expiry
            .lock()
            .map_err(|_| AppError::internal("Hold expiry index lock poisoned"))
    }
}

#[async_trait]
impl ReservationStore for MemoryReservationStore {
    async fn register_resources(&self, resources: &[Resource]) -> AppResult<()> {
        for resource in resources {
            self.slots.insert(
                resource.id,
                Arc::new(Mutex::new(SlotState {
                    resource: resource.clone(),
                    active: None,
                })),
            );
            self.events
                .entry(resource.event_id)
                .or_default()
                .push(resource.id);
        }
        Ok(())
    }

    async fn get_resource(&self, id: ResourceId) -> AppResult<Option<Resource>> {
        let Some(cell) = self.slot_cell(id) else {
            return Ok(None);
        };
        let state = cell.lock().await;
        Ok(Some(state.resource.clone()))
    }

    async fn list_resources(&self, event_id: EventId) -> AppResult<Vec<Resource>> {
        let ids = self
            .events
            .get(&event_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        let mut resources = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(resource) = self.get_resource(id).await? {
                resources.push(resource);
            }
        }
        Ok(resources)
    }

    async fn get_hold(&self, id: HoldId) -> AppResult<Option<Hold>> {
        Ok(self.holds.get(&id).map(|entry| entry.value().clone()))
    }

    async fn update_slot(
        &self,
        resource_id: ResourceId,
        apply: &mut (dyn for<'s> FnMut(&'s mut Slot) + Send),
    ) -> AppResult<Slot> {
        let cell = self
            .slot_cell(resource_id)
            .ok_or_else(|| AppError::not_found(format!("Resource {resource_id} not found")))?;

        let mut state = cell.lock().await;
        let mut slot = Slot::new(state.resource.clone(), state.active.clone());
        apply(&mut slot);

        if slot.is_dirty() {
            let mut expiry = self.expiry_index()?;
            for hold in slot.written_holds() {
                let key = (hold.expires_at, hold.id);
                if hold.is_active() {
                    expiry.insert(key);
                } else {
                    expiry.remove(&key);
                }
                self.holds.insert(hold.id, hold.clone());
            }
            drop(expiry);
            state.resource = slot.resource().clone();
            state.active = slot.active_hold().cloned();
        }

        Ok(slot)
    }

    async fn find_expired_holds(
        &self,
        now: DateTime<Utc>,
        exclude: &[HoldId],
        limit: usize,
    ) -> AppResult<Vec<Hold>> {
        let ids: Vec<HoldId> = self
            .expiry_index()?
            .iter()
            .take_while(|(expires_at, _)| *expires_at <= now)
            .map(|(_, id)| *id)
            .filter(|id| !exclude.contains(id))
            .take(limit)
            .collect();

        Ok(ids
            .into_iter()
            .filter_map(|id| self.holds.get(&id).map(|entry| entry.value().clone()))
            .collect())
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use boxoffice_core::error::ErrorKind;
    use boxoffice_core::types::{ClaimantId, HoldStatus, ResourceStatus};

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    async fn seeded(labels: &[&str]) -> (MemoryReservationStore, Vec<Resource>) {
        let store = MemoryReservationStore::new();
        let event = EventId::new();
        let resources: Vec<Resource> = labels
            .iter()
            .map(|label| Resource::new(event, *label, now()))
            .collect();
        store.register_resources(&resources).await.unwrap();
        (store, resources)
    }

    #[tokio::test]
    async fn test_list_preserves_registration_order() {
        let (store, resources) = seeded(&["A-1", "A-2", "A-3"]).await;
        let listed = store.list_resources(resources[0].event_id).await.unwrap();
        let labels: Vec<_> = listed.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["A-1", "A-2", "A-3"]);
        assert!(store.list_resources(EventId::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_resource_is_not_found() {
        let store = MemoryReservationStore::new();
        let err = store
            .update_slot(ResourceId::new(), &mut |_slot: &mut Slot| {})
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_update_persists_resource_and_hold() {
        let (store, resources) = seeded(&["A-1"]).await;
        let id = resources[0].id;
        let claimant = ClaimantId::parse("alice").unwrap();

        let slot = store
            .update_slot(id, &mut |slot: &mut Slot| {
                let _ = slot.open_hold(claimant.clone(), now(), Duration::from_secs(30));
            })
            .await
            .unwrap();
        let hold = slot.active_hold().cloned().unwrap();

        let stored = store.get_resource(id).await.unwrap().unwrap();
        assert_eq!(stored.status, ResourceStatus::Held);
        assert_eq!(store.get_hold(hold.id).await.unwrap(), Some(hold.clone()));

        let later = now() + chrono::Duration::seconds(31);
        let expired = store.find_expired_holds(later, &[], 10).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert!(store.find_expired_holds(now(), &[], 10).await.unwrap().is_empty());
        assert!(
            store
                .find_expired_holds(later, &[hold.id], 10)
                .await
                .unwrap()
                .is_empty()
        );

        store
            .update_slot(id, &mut |slot: &mut Slot| {
                slot.close_hold(HoldStatus::Expired, later);
            })
            .await
            .unwrap();
        assert!(store.find_expired_holds(later, &[], 10).await.unwrap().is_empty());
        assert_eq!(
            store.get_hold(hold.id).await.unwrap().unwrap().status,
            HoldStatus::Expired
        );
    }
}
