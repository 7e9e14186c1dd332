//! Expiry reclaimer: returns the resources of expired holds to sale.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use boxoffice_core::types::HoldId;
use boxoffice_reservation::ReservationManager;

use crate::task::{PeriodicTask, TaskError};

/// Outcome counts of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Expired holds found.
    pub examined: usize,
    /// Holds moved to `Expired` by this sweep.
    pub reclaimed: usize,
    /// Holds already closed by a racing commit, release, or claim.
    pub skipped: usize,
    /// Holds whose reclamation failed; retried next sweep.
    pub failed: usize,
}

/// Periodically expires every active hold past its expiry.
///
/// Each hold is reclaimed through [`ReservationManager::expire_hold`], the
/// same atomic slot update a commit uses, so a racing commit and the sweep
/// agree on one winner. One hold failing never stops the others.
#[derive(Debug)]
pub struct ExpiryReclaimer {
    manager: Arc<ReservationManager>,
    interval: Duration,
    batch_size: usize,
}

impl ExpiryReclaimer {
    /// Create a reclaimer sweeping every `interval`, fetching expired holds
    /// `batch_size` at a time.
    pub fn new(manager: Arc<ReservationManager>, interval: Duration, batch_size: usize) -> Self {
        Self {
            manager,
            interval,
            batch_size: batch_size.max(1),
        }
    }

    /// Reclaim all currently expired holds.
    ///
    /// Pages through expired holds until a page comes back short. A hold
    /// that fails (or was closed by someone else) is excluded from later
    /// pages of the same sweep, so it cannot crowd out the rest; it is
    /// retried on the next sweep.
    pub async fn sweep(&self) -> Result<SweepReport, TaskError> {
        let mut report = SweepReport::default();
        let mut passed_over: Vec<HoldId> = Vec::new();

        loop {
            let batch = self
                .manager
                .expired_holds(&passed_over, self.batch_size)
                .await
                .map_err(|e| TaskError::Transient(format!("Failed to list expired holds: {e}")))?;
            let full_page = batch.len() == self.batch_size;

            for hold in &batch {
                report.examined += 1;
                match self.manager.expire_hold(hold.id).await {
                    Ok(true) => report.reclaimed += 1,
                    Ok(false) => {
                        report.skipped += 1;
                        passed_over.push(hold.id);
                    }
                    Err(e) => {
                        report.failed += 1;
                        passed_over.push(hold.id);
                        tracing::warn!(
                            hold_id = %hold.id,
                            resource_id = %hold.resource_id,
                            error = %e,
                            "Failed to reclaim expired hold"
                        );
                    }
                }
            }

            if !full_page {
                break;
            }
        }

        if report.examined > 0 {
            tracing::info!(
                reclaimed = report.reclaimed,
                skipped = report.skipped,
                failed = report.failed,
                "Expiry sweep finished"
            );
        }
        Ok(report)
    }
}

#[async_trait]
impl PeriodicTask for ExpiryReclaimer {
    fn name(&self) -> &str {
        "expiry_reclaimer"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run_once(&self) -> Result<Value, TaskError> {
        let report = self.sweep().await?;
        serde_json::to_value(report).map_err(|e| TaskError::Internal(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{DateTime, Utc};
    use tokio::sync::watch;

    use boxoffice_core::config::ReservationConfig;
    use boxoffice_core::error::{AppError, ErrorKind};
    use boxoffice_core::result::AppResult;
    use boxoffice_core::traits::{Clock, ManualClock};
    use boxoffice_core::types::{ClaimantId, EventId, HoldStatus, ResourceId, ResourceStatus};
    use boxoffice_entity::hold::Hold;
    use boxoffice_entity::resource::Resource;
    use boxoffice_realtime::ChangeNotifier;
    use boxoffice_reservation::store::{MemoryReservationStore, ReservationStore, Slot};

    use super::*;
    use crate::runner::WorkerRunner;

    fn manager_with(clock: Arc<dyn Clock>) -> Arc<ReservationManager> {
        manager_over(Arc::new(MemoryReservationStore::new()), clock)
    }

    fn manager_over(
        store: Arc<dyn ReservationStore>,
        clock: Arc<dyn Clock>,
    ) -> Arc<ReservationManager> {
        Arc::new(ReservationManager::new(
            store,
            ChangeNotifier::new(16),
            clock,
            &ReservationConfig::default(),
        ))
    }

    /// Memory store whose slot writes fail for one chosen resource.
    #[derive(Debug, Default)]
    struct BrokenSlotStore {
        inner: MemoryReservationStore,
        broken: Mutex<Option<ResourceId>>,
    }

    impl BrokenSlotStore {
        fn break_resource(&self, id: ResourceId) {
            *self.broken.lock().unwrap() = Some(id);
        }
    }

    #[async_trait]
    impl ReservationStore for BrokenSlotStore {
        async fn register_resources(&self, resources: &[Resource]) -> AppResult<()> {
            self.inner.register_resources(resources).await
        }

        async fn get_resource(&self, id: ResourceId) -> AppResult<Option<Resource>> {
            self.inner.get_resource(id).await
        }

        async fn list_resources(&self, event_id: EventId) -> AppResult<Vec<Resource>> {
            self.inner.list_resources(event_id).await
        }

        async fn get_hold(&self, id: HoldId) -> AppResult<Option<Hold>> {
            self.inner.get_hold(id).await
        }

        async fn update_slot(
            &self,
            resource_id: ResourceId,
            apply: &mut (dyn for<'s> FnMut(&'s mut Slot) + Send),
        ) -> AppResult<Slot> {
            if *self.broken.lock().unwrap() == Some(resource_id) {
                return Err(AppError::store_unavailable("slot write refused"));
            }
            self.inner.update_slot(resource_id, apply).await
        }

        async fn find_expired_holds(
            &self,
            now: DateTime<Utc>,
            exclude: &[HoldId],
            limit: usize,
        ) -> AppResult<Vec<Hold>> {
            self.inner.find_expired_holds(now, exclude, limit).await
        }

        async fn health_check(&self) -> AppResult<()> {
            Ok(())
        }
    }

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("S-{i}")).collect()
    }

    #[tokio::test]
    async fn test_sweep_reclaims_only_expired_holds_and_is_idempotent() {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let manager = manager_with(clock.clone());
        let resources = manager
            .register_resources(EventId::new(), labels(3))
            .await
            .unwrap();
        let x = ClaimantId::parse("x").unwrap();

        let short = manager
            .claim(resources[0].id, &x, Some(Duration::from_secs(5)))
            .await
            .unwrap();
        manager
            .claim(resources[1].id, &x, Some(Duration::from_secs(5)))
            .await
            .unwrap();
        let long = manager
            .claim(resources[2].id, &x, Some(Duration::from_secs(600)))
            .await
            .unwrap();
        manager.commit(resources[1].id, &x).await.unwrap();

        clock.advance(Duration::from_secs(10));
        let reclaimer = ExpiryReclaimer::new(manager.clone(), Duration::from_secs(60), 500);

        let report = reclaimer.sweep().await.unwrap();
        assert_eq!(report.reclaimed, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(
            manager.get_hold(short.id).await.unwrap().status,
            HoldStatus::Expired
        );
        assert_eq!(
            manager.get_resource(resources[0].id).await.unwrap().status,
            ResourceStatus::Available
        );
        assert_eq!(
            manager.get_resource(resources[1].id).await.unwrap().status,
            ResourceStatus::Committed
        );
        assert_eq!(
            manager.get_hold(long.id).await.unwrap().status,
            HoldStatus::Active
        );

        let again = reclaimer.sweep().await.unwrap();
        assert_eq!(again, SweepReport::default());
    }

    #[tokio::test]
    async fn test_sweep_pages_through_more_than_one_batch() {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let manager = manager_with(clock.clone());
        let resources = manager
            .register_resources(EventId::new(), labels(7))
            .await
            .unwrap();
        for (i, resource) in resources.iter().enumerate() {
            let claimant = ClaimantId::parse(format!("c{i}")).unwrap();
            manager
                .claim(resource.id, &claimant, Some(Duration::from_secs(1)))
                .await
                .unwrap();
        }

        clock.advance(Duration::from_secs(2));
        let reclaimer = ExpiryReclaimer::new(manager.clone(), Duration::from_secs(60), 3);
        let report = reclaimer.sweep().await.unwrap();
        assert_eq!(report.reclaimed, 7);
        assert!(manager.expired_holds(&[], 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_hold_does_not_block_later_holds() {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let store = Arc::new(BrokenSlotStore::default());
        let manager = manager_over(store.clone(), clock.clone());
        let resources = manager
            .register_resources(EventId::new(), labels(2))
            .await
            .unwrap();
        let x = ClaimantId::parse("x").unwrap();

        // the broken hold expires first, so it heads every page
        let stuck = manager
            .claim(resources[0].id, &x, Some(Duration::from_secs(1)))
            .await
            .unwrap();
        let healthy = manager
            .claim(resources[1].id, &x, Some(Duration::from_secs(2)))
            .await
            .unwrap();
        store.break_resource(resources[0].id);
        clock.advance(Duration::from_secs(10));

        let reclaimer = ExpiryReclaimer::new(manager.clone(), Duration::from_secs(60), 1);
        let report = reclaimer.sweep().await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.reclaimed, 1);
        assert_eq!(
            manager.get_hold(healthy.id).await.unwrap().status,
            HoldStatus::Expired
        );
        assert_eq!(
            manager.get_hold(stuck.id).await.unwrap().status,
            HoldStatus::Active
        );

        // retried, and still failing, on the next cycle
        let again = reclaimer.sweep().await.unwrap();
        assert_eq!(again.failed, 1);
        assert_eq!(again.reclaimed, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_commit_racing_sweep_has_one_winner_per_hold() {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let manager = manager_with(clock.clone());
        let resources = manager
            .register_resources(EventId::new(), labels(24))
            .await
            .unwrap();
        let x = ClaimantId::parse("x").unwrap();

        let mut holds = Vec::new();
        for resource in &resources {
            let hold = manager
                .claim(resource.id, &x, Some(Duration::from_secs(30)))
                .await
                .unwrap();
            holds.push(hold);
        }
        let expires_at = holds[0].expires_at;
        clock.set(expires_at - chrono::Duration::milliseconds(1));

        let commits: Vec<_> = resources
            .iter()
            .map(|resource| {
                let manager = Arc::clone(&manager);
                let x = x.clone();
                let id = resource.id;
                tokio::spawn(async move { manager.commit(id, &x).await })
            })
            .collect();
        let sweeper = {
            let clock = clock.clone();
            let reclaimer = ExpiryReclaimer::new(manager.clone(), Duration::from_secs(60), 5);
            tokio::spawn(async move {
                clock.set(expires_at);
                reclaimer.sweep().await.unwrap()
            })
        };

        let outcomes: Vec<_> = futures::future::join_all(commits)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        sweeper.await.unwrap();

        for ((resource, hold), outcome) in resources.iter().zip(&holds).zip(outcomes) {
            let stored = manager.get_hold(hold.id).await.unwrap();
            let status = manager.get_resource(resource.id).await.unwrap().status;
            match outcome {
                Ok(committed) => {
                    assert_eq!(committed.status, HoldStatus::Completed);
                    assert_eq!(stored.status, HoldStatus::Completed);
                    assert_eq!(status, ResourceStatus::Committed);
                }
                Err(e) => {
                    assert!(
                        matches!(e.kind, ErrorKind::HoldExpired | ErrorKind::HoldNotFound),
                        "unexpected error: {e}"
                    );
                    assert_eq!(stored.status, HoldStatus::Expired);
                    assert_eq!(status, ResourceStatus::Available);
                }
            }
        }
        assert!(manager.expired_holds(&[], 100).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_runner_drives_reclaimer_in_virtual_time() {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let manager = manager_with(clock.clone());
        let resource = manager
            .register_resources(EventId::new(), labels(1))
            .await
            .unwrap()
            .remove(0);
        let x = ClaimantId::parse("x").unwrap();
        let hold = manager
            .claim(resource.id, &x, Some(Duration::from_secs(30)))
            .await
            .unwrap();

        let mut runner = WorkerRunner::new("test");
        runner.register(Arc::new(ExpiryReclaimer::new(
            manager.clone(),
            Duration::from_secs(60),
            100,
        )));
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { runner.run(rx).await });

        // the immediate first sweep finds nothing to reclaim
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(
            manager.get_hold(hold.id).await.unwrap().status,
            HoldStatus::Active
        );

        clock.advance(Duration::from_secs(31));
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(
            manager.get_hold(hold.id).await.unwrap().status,
            HoldStatus::Expired
        );

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
