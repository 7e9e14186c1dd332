//! Reservation manager: the claim / commit / release state machine.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use boxoffice_core::config::ReservationConfig;
use boxoffice_core::error::AppError;
use boxoffice_core::events::{ChangeEvent, ChangeKind, ResourceSnapshot};
use boxoffice_core::result::AppResult;
use boxoffice_core::traits::{ChangePublisher, Clock};
use boxoffice_core::types::{ClaimantId, EventId, HoldId, HoldStatus, ResourceId};
use boxoffice_entity::hold::Hold;
use boxoffice_entity::resource::Resource;

use crate::store::{ReservationStore, Slot};

/// Longest accepted resource label.
pub const MAX_LABEL_LEN: usize = 64;

/// A hold that was found expired while handling another operation.
type Lapsed = Option<(Hold, ResourceSnapshot)>;

/// Coordinates resource state transitions over a [`ReservationStore`].
///
/// Every successful transition publishes a [`ChangeEvent`] to the resource's
/// event group. Expiry is decided against the injected [`Clock`]: a hold
/// is expired from `expires_at` onwards.
#[derive(Debug, Clone)]
pub struct ReservationManager {
    store: Arc<dyn ReservationStore>,
    publisher: Arc<dyn ChangePublisher>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
    max_ttl: Duration,
}

impl ReservationManager {
    /// Create a new reservation manager.
    pub fn new(
        store: Arc<dyn ReservationStore>,
        publisher: Arc<dyn ChangePublisher>,
        clock: Arc<dyn Clock>,
        config: &ReservationConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            clock,
            default_ttl: config.default_ttl(),
            max_ttl: config.max_ttl(),
        }
    }

    /// Register new `Available` resources for an event.
    pub async fn register_resources(
        &self,
        event_id: EventId,
        labels: Vec<String>,
    ) -> AppResult<Vec<Resource>> {
        if labels.is_empty() {
            return Err(AppError::validation("At least one label is required"));
        }

        let now = self.clock.now();
        let mut resources = Vec::with_capacity(labels.len());
        for label in labels {
            let label = label.trim();
            if label.is_empty() || label.len() > MAX_LABEL_LEN {
                return Err(AppError::validation(format!(
                    "Resource labels must be 1 to {MAX_LABEL_LEN} characters"
                )));
            }
            resources.push(Resource::new(event_id, label, now));
        }

        self.store.register_resources(&resources).await?;

        info!(
            event_id = %event_id,
            count = resources.len(),
            "Resources registered"
        );
        self.publish(ChangeEvent {
            event_id,
            kind: ChangeKind::Registered,
            hold_id: None,
            resources: resources.iter().map(Resource::snapshot).collect(),
            occurred_at: now,
        });
        Ok(resources)
    }

    /// Look up a resource.
    pub async fn get_resource(&self, id: ResourceId) -> AppResult<Resource> {
        self.store
            .get_resource(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Resource {id} not found")))
    }

    /// All resources of an event, in registration order.
    pub async fn list_resources(&self, event_id: EventId) -> AppResult<Vec<Resource>> {
        self.store.list_resources(event_id).await
    }

    /// Look up a hold in any status.
    pub async fn get_hold(&self, id: HoldId) -> AppResult<Hold> {
        self.store
            .get_hold(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Hold {id} not found")))
    }

    /// Claim a resource for `claimant` for `ttl` (or the configured default).
    ///
    /// An expired hold still marked active is expired first, so an
    /// abandoned resource can be claimed without waiting for the sweep.
    pub async fn claim(
        &self,
        resource_id: ResourceId,
        claimant: &ClaimantId,
        ttl: Option<Duration>,
    ) -> AppResult<Hold> {
        let ttl = self.resolve_ttl(ttl)?;
        let now = self.clock.now();

        let mut lapsed: Lapsed = None;
        let mut outcome: Option<AppResult<Hold>> = None;
        let slot = self
            .store
            .update_slot(resource_id, &mut |slot: &mut Slot| {
                lapsed = expire_if_lapsed(slot, now);
                outcome = Some(slot.open_hold(claimant.clone(), now, ttl));
            })
            .await?;

        self.publish_lapsed(lapsed);
        match settle(outcome)? {
            Ok(hold) => {
                info!(
                    resource_id = %resource_id,
                    claimant = %claimant,
                    hold_id = %hold.id,
                    expires_at = %hold.expires_at,
                    "Hold claimed"
                );
                self.publish_transition(ChangeKind::Claimed, &hold, &slot);
                Ok(hold)
            }
            Err(e) => {
                debug!(resource_id = %resource_id, claimant = %claimant, error = %e, "Claim rejected");
                Err(e)
            }
        }
    }

    /// Commit `claimant`'s hold on a resource, selling it.
    ///
    /// A hold at or past its expiry is expired on the spot; its owner gets
    /// `HoldExpired`.
    pub async fn commit(&self, resource_id: ResourceId, claimant: &ClaimantId) -> AppResult<Hold> {
        self.finish(resource_id, claimant, HoldStatus::Completed)
            .await
    }

    /// Release `claimant`'s hold early, making the resource available again.
    pub async fn release(&self, resource_id: ResourceId, claimant: &ClaimantId) -> AppResult<Hold> {
        self.finish(resource_id, claimant, HoldStatus::Cancelled)
            .await
    }

    /// Expire one hold if it is still active and past its expiry.
    ///
    /// Returns whether anything changed. Calling it again for the same hold,
    /// or racing it against a commit, is safe: whichever update reaches the
    /// slot first wins and the other sees a closed hold.
    pub async fn expire_hold(&self, hold_id: HoldId) -> AppResult<bool> {
        let Some(hold) = self.store.get_hold(hold_id).await? else {
            return Ok(false);
        };
        if !hold.is_active() {
            return Ok(false);
        }

        let now = self.clock.now();
        let mut lapsed: Lapsed = None;
        self.store
            .update_slot(hold.resource_id, &mut |slot: &mut Slot| {
                lapsed = None;
                if slot.active_hold().is_some_and(|active| active.id == hold_id) {
                    lapsed = expire_if_lapsed(slot, now);
                }
            })
            .await?;

        let changed = lapsed.is_some();
        self.publish_lapsed(lapsed);
        Ok(changed)
    }

    /// Active holds whose expiry has passed, soonest first, leaving out
    /// the ids in `exclude`.
    pub async fn expired_holds(&self, exclude: &[HoldId], limit: usize) -> AppResult<Vec<Hold>> {
        self.store
            .find_expired_holds(self.clock.now(), exclude, limit)
            .await
    }

    /// Check the backing store.
    pub async fn health_check(&self) -> AppResult<()> {
        self.store.health_check().await
    }

    async fn finish(
        &self,
        resource_id: ResourceId,
        claimant: &ClaimantId,
        status: HoldStatus,
    ) -> AppResult<Hold> {
        let now = self.clock.now();

        let mut lapsed: Lapsed = None;
        let mut outcome: Option<AppResult<Hold>> = None;
        let slot = self
            .store
            .update_slot(resource_id, &mut |slot: &mut Slot| {
                let current = slot
                    .active_hold()
                    .map(|hold| (hold.is_expired_at(now), hold.is_owned_by(claimant)));

                lapsed = None;
                outcome = Some(match current {
                    None => Err(AppError::hold_not_found(format!(
                        "No active hold on resource {resource_id}"
                    ))),
                    Some((true, owned)) => {
                        lapsed = expire_if_lapsed(slot, now);
                        if owned {
                            Err(AppError::hold_expired(format!(
                                "Hold on resource {resource_id} has expired"
                            )))
                        } else {
                            Err(AppError::hold_not_found(format!(
                                "No active hold on resource {resource_id}"
                            )))
                        }
                    }
                    Some((false, false)) => Err(AppError::owner_mismatch(format!(
                        "Resource {resource_id} is held by another claimant"
                    ))),
                    Some((false, true)) => slot
                        .close_hold(status, now)
                        .ok_or_else(|| AppError::internal("Active hold vanished during update")),
                });
            })
            .await?;

        self.publish_lapsed(lapsed);
        match settle(outcome)? {
            Ok(hold) => {
                let kind = match status {
                    HoldStatus::Completed => ChangeKind::Committed,
                    _ => ChangeKind::Released,
                };
                info!(
                    resource_id = %resource_id,
                    claimant = %claimant,
                    hold_id = %hold.id,
                    status = %hold.status,
                    "Hold closed"
                );
                self.publish_transition(kind, &hold, &slot);
                Ok(hold)
            }
            Err(e) => {
                debug!(
                    resource_id = %resource_id,
                    claimant = %claimant,
                    error = %e,
                    "Hold transition rejected"
                );
                Err(e)
            }
        }
    }

    fn resolve_ttl(&self, ttl: Option<Duration>) -> AppResult<Duration> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        if ttl.is_zero() {
            return Err(AppError::validation("TTL must be positive"));
        }
        if ttl > self.max_ttl {
            return Err(AppError::validation(format!(
                "TTL must not exceed {} seconds",
                self.max_ttl.as_secs()
            )));
        }
        Ok(ttl)
    }

    fn publish_transition(&self, kind: ChangeKind, hold: &Hold, slot: &Slot) {
        let resource = slot.resource();
        self.publish(ChangeEvent {
            event_id: resource.event_id,
            kind,
            hold_id: Some(hold.id),
            resources: vec![resource.snapshot()],
            occurred_at: resource.updated_at,
        });
    }

    fn publish_lapsed(&self, lapsed: Lapsed) {
        let Some((hold, snapshot)) = lapsed else {
            return;
        };
        info!(
            resource_id = %hold.resource_id,
            claimant = %hold.claimant_id,
            hold_id = %hold.id,
            "Hold expired"
        );
        self.publish(ChangeEvent {
            event_id: snapshot.event_id,
            kind: ChangeKind::Expired,
            hold_id: Some(hold.id),
            occurred_at: snapshot.updated_at,
            resources: vec![snapshot],
        });
    }

    fn publish(&self, change: ChangeEvent) {
        let group = change.event_id;
        let delivered = self.publisher.publish(&group, change);
        debug!(event_id = %group, delivered, "Change published");
    }
}

/// Close the slot's active hold as `Expired` if its TTL has elapsed.
fn expire_if_lapsed(slot: &mut Slot, now: chrono::DateTime<chrono::Utc>) -> Lapsed {
    if !slot.active_hold().is_some_and(|hold| hold.is_expired_at(now)) {
        return None;
    }
    slot.close_hold(HoldStatus::Expired, now)
        .map(|hold| (hold, slot.resource().snapshot()))
}

/// Unwrap the outcome recorded by an update closure.
fn settle(outcome: Option<AppResult<Hold>>) -> AppResult<AppResult<Hold>> {
    outcome.ok_or_else(|| AppError::internal("Slot update completed without running"))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{DateTime, Utc};

    use boxoffice_core::error::ErrorKind;
    use boxoffice_core::traits::ManualClock;
    use boxoffice_core::types::ResourceStatus;

    use super::*;
    use crate::store::MemoryReservationStore;

    #[derive(Debug, Default)]
    struct RecordingPublisher {
        changes: Mutex<Vec<ChangeEvent>>,
    }

    impl RecordingPublisher {
        fn kinds(&self) -> Vec<ChangeKind> {
            self.changes.lock().unwrap().iter().map(|c| c.kind).collect()
        }
    }

    impl ChangePublisher for RecordingPublisher {
        fn publish(&self, _group: &EventId, change: ChangeEvent) -> usize {
            self.changes.lock().unwrap().push(change);
            1
        }
    }

    struct Harness {
        manager: ReservationManager,
        clock: Arc<ManualClock>,
        publisher: Arc<RecordingPublisher>,
        resource: Resource,
    }

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn claimant(name: &str) -> ClaimantId {
        ClaimantId::parse(name).unwrap()
    }

    async fn harness() -> Harness {
        let clock = Arc::new(ManualClock::new(start()));
        let publisher = Arc::new(RecordingPublisher::default());
        let manager = ReservationManager::new(
            Arc::new(MemoryReservationStore::new()),
            publisher.clone(),
            clock.clone(),
            &ReservationConfig::default(),
        );
        let resource = manager
            .register_resources(EventId::new(), vec!["A-1".to_string()])
            .await
            .unwrap()
            .remove(0);
        Harness {
            manager,
            clock,
            publisher,
            resource,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_claims_have_exactly_one_winner() {
        let h = harness().await;
        let manager = Arc::new(h.manager);

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let manager = Arc::clone(&manager);
                let id = h.resource.id;
                tokio::spawn(async move {
                    manager
                        .claim(id, &claimant(&format!("c{i}")), Some(Duration::from_secs(300)))
                        .await
                })
            })
            .collect();

        let mut winners = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => winners += 1,
                Err(e) => assert_eq!(e.kind, ErrorKind::ResourceUnavailable),
            }
        }
        assert_eq!(winners, 1);
        let resource = manager.get_resource(h.resource.id).await.unwrap();
        assert_eq!(resource.status, ResourceStatus::Held);
    }

    #[tokio::test]
    async fn test_expired_hold_is_reclaimed_lazily_on_claim() {
        let h = harness().await;
        let x = claimant("x");
        let y = claimant("y");

        let first = h
            .manager
            .claim(h.resource.id, &x, Some(Duration::from_secs(1)))
            .await
            .unwrap();
        h.clock.advance(Duration::from_secs(2));

        let second = h
            .manager
            .claim(h.resource.id, &y, Some(Duration::from_secs(300)))
            .await
            .unwrap();
        assert_eq!(second.claimant_id, y);

        let old = h.manager.get_hold(first.id).await.unwrap();
        assert_eq!(old.status, HoldStatus::Expired);
        assert_eq!(
            h.publisher.kinds(),
            vec![
                ChangeKind::Registered,
                ChangeKind::Claimed,
                ChangeKind::Expired,
                ChangeKind::Claimed
            ]
        );
        // the expiry and the new claim share one update but stay ordered
        let revisions: Vec<i64> = h
            .publisher
            .changes
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.resources[0].revision)
            .collect();
        assert_eq!(revisions, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_second_commit_reports_hold_not_found() {
        let h = harness().await;
        let x = claimant("x");
        h.manager.claim(h.resource.id, &x, None).await.unwrap();

        let committed = h.manager.commit(h.resource.id, &x).await.unwrap();
        assert_eq!(committed.status, HoldStatus::Completed);

        let err = h.manager.commit(h.resource.id, &x).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::HoldNotFound);

        let resource = h.manager.get_resource(h.resource.id).await.unwrap();
        assert_eq!(resource.status, ResourceStatus::Committed);
        let err = h
            .manager
            .claim(h.resource.id, &claimant("y"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ResourceUnavailable);
    }

    #[tokio::test]
    async fn test_commit_at_expiry_instant_expires_the_hold() {
        let h = harness().await;
        let x = claimant("x");
        let hold = h
            .manager
            .claim(h.resource.id, &x, Some(Duration::from_secs(300)))
            .await
            .unwrap();

        h.clock.set(hold.expires_at);
        let err = h.manager.commit(h.resource.id, &x).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::HoldExpired);

        let resource = h.manager.get_resource(h.resource.id).await.unwrap();
        assert_eq!(resource.status, ResourceStatus::Available);
        let stored = h.manager.get_hold(hold.id).await.unwrap();
        assert_eq!(stored.status, HoldStatus::Expired);
        assert_eq!(h.publisher.kinds().last(), Some(&ChangeKind::Expired));
    }

    #[tokio::test]
    async fn test_commit_just_before_expiry_succeeds() {
        let h = harness().await;
        let x = claimant("x");
        h.manager
            .claim(h.resource.id, &x, Some(Duration::from_secs(300)))
            .await
            .unwrap();

        h.clock.advance(Duration::from_millis(299_999));
        let hold = h.manager.commit(h.resource.id, &x).await.unwrap();
        assert_eq!(hold.status, HoldStatus::Completed);
    }

    #[tokio::test]
    async fn test_other_claimant_cannot_commit_or_release() {
        let h = harness().await;
        let x = claimant("x");
        let y = claimant("y");
        h.manager.claim(h.resource.id, &x, None).await.unwrap();

        let err = h.manager.commit(h.resource.id, &y).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::OwnerMismatch);
        let err = h.manager.release(h.resource.id, &y).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::OwnerMismatch);

        let resource = h.manager.get_resource(h.resource.id).await.unwrap();
        assert_eq!(resource.status, ResourceStatus::Held);
    }

    #[tokio::test]
    async fn test_release_frees_the_resource() {
        let h = harness().await;
        let x = claimant("x");
        h.manager.claim(h.resource.id, &x, None).await.unwrap();

        let released = h.manager.release(h.resource.id, &x).await.unwrap();
        assert_eq!(released.status, HoldStatus::Cancelled);

        let err = h.manager.release(h.resource.id, &x).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::HoldNotFound);

        h.manager
            .claim(h.resource.id, &claimant("y"), None)
            .await
            .unwrap();
        assert_eq!(h.publisher.kinds()[2], ChangeKind::Released);
    }

    #[tokio::test]
    async fn test_expire_hold_is_idempotent() {
        let h = harness().await;
        let hold = h
            .manager
            .claim(h.resource.id, &claimant("x"), Some(Duration::from_secs(10)))
            .await
            .unwrap();

        assert!(!h.manager.expire_hold(hold.id).await.unwrap());
        h.clock.advance(Duration::from_secs(10));

        assert_eq!(h.manager.expired_holds(&[], 10).await.unwrap().len(), 1);
        assert!(h.manager.expire_hold(hold.id).await.unwrap());
        assert!(!h.manager.expire_hold(hold.id).await.unwrap());
        assert!(h.manager.expired_holds(&[], 10).await.unwrap().is_empty());

        let expired_events = h
            .publisher
            .kinds()
            .into_iter()
            .filter(|k| *k == ChangeKind::Expired)
            .count();
        assert_eq!(expired_events, 1);
    }

    #[tokio::test]
    async fn test_ttl_bounds_are_validated() {
        let h = harness().await;
        let x = claimant("x");
        let err = h
            .manager
            .claim(h.resource.id, &x, Some(Duration::ZERO))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = h
            .manager
            .claim(h.resource.id, &x, Some(Duration::from_secs(3601)))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_unknown_resource_is_not_found() {
        let h = harness().await;
        let err = h
            .manager
            .claim(ResourceId::new(), &claimant("x"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_blank_labels_are_rejected() {
        let h = harness().await;
        let err = h
            .manager
            .register_resources(EventId::new(), vec!["  ".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
