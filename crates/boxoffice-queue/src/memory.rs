//! In-memory admission queue using a Tokio mutex per group.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use boxoffice_core::error::AppError;
use boxoffice_core::result::AppResult;
use boxoffice_core::traits::Clock;
use boxoffice_core::types::{ClaimantId, EventId};
use boxoffice_entity::queue::{AdmissionOutcome, JoinReceipt, QueueEntry, QueuePosition};

use crate::queue::AdmissionQueue;

/// One group's line.
#[derive(Debug, Default)]
struct GroupLine {
    /// Arrival rank to claimant, in arrival order.
    line: BTreeMap<u64, ClaimantId>,
    /// Claimant to its entry.
    members: HashMap<ClaimantId, QueueEntry>,
}

impl GroupLine {
    fn remove(&mut self, claimant: &ClaimantId) -> bool {
        match self.members.remove(claimant) {
            Some(entry) => {
                self.line.remove(&entry.arrival);
                true
            }
            None => false,
        }
    }
}

/// In-memory admission queue.
///
/// Suitable for single-node deployments only. A group's line is dropped
/// once it drains; arrival ranks come from one shared counter, so they
/// keep increasing when the group fills up again.
#[derive(Debug)]
pub struct MemoryAdmissionQueue {
    groups: DashMap<EventId, Arc<Mutex<GroupLine>>>,
    arrivals: AtomicU64,
    clock: Arc<dyn Clock>,
    track_activity: bool,
}

impl MemoryAdmissionQueue {
    /// Create an empty queue.
    ///
    /// With `track_activity`, position reads refresh the claimant's
    /// last-seen time for idle eviction.
    pub fn new(clock: Arc<dyn Clock>, track_activity: bool) -> Self {
        Self {
            groups: DashMap::new(),
            arrivals: AtomicU64::new(0),
            clock,
            track_activity,
        }
    }

    fn group(&self, group: EventId) -> Arc<Mutex<GroupLine>> {
        Arc::clone(self.groups.entry(group).or_default().value())
    }

    fn existing_group(&self, group: EventId) -> Option<Arc<Mutex<GroupLine>>> {
        self.groups.get(&group).map(|entry| Arc::clone(entry.value()))
    }

    /// Drop a drained group. Callers must have released their handle.
    ///
    /// The map's shard lock is held while checking, and a handle count of
    /// one means no caller can be about to touch the line.
    fn prune_if_empty(&self, group: EventId) {
        self.groups.remove_if(&group, |_, cell| {
            Arc::strong_count(cell) == 1
                && cell.try_lock().is_ok_and(|line| line.members.is_empty())
        });
    }
}

#[async_trait]
impl AdmissionQueue for MemoryAdmissionQueue {
    async fn join(&self, group: EventId, claimant: &ClaimantId) -> AppResult<JoinReceipt> {
        let cell = self.group(group);
        let mut line = cell.lock().await;
        let now = self.clock.now();

        if let Some(entry) = line.members.get_mut(claimant) {
            entry.last_seen_at = now;
            return Ok(JoinReceipt {
                rank: entry.arrival,
                rejoined: true,
            });
        }

        let arrival = self.arrivals.fetch_add(1, Ordering::Relaxed) + 1;
        line.line.insert(arrival, claimant.clone());
        line.members.insert(
            claimant.clone(),
            QueueEntry {
                claimant_id: claimant.clone(),
                arrival,
                joined_at: now,
                last_seen_at: now,
            },
        );
        Ok(JoinReceipt {
            rank: arrival,
            rejoined: false,
        })
    }

    async fn position(&self, group: EventId, claimant: &ClaimantId) -> AppResult<QueuePosition> {
        let not_waiting = || AppError::not_found(format!("{claimant} is not waiting in {group}"));
        let cell = self.existing_group(group).ok_or_else(not_waiting)?;
        let mut line = cell.lock().await;

        let now = self.clock.now();
        let track = self.track_activity;
        let entry = line.members.get_mut(claimant).ok_or_else(not_waiting)?;
        if track {
            entry.last_seen_at = now;
        }
        let arrival = entry.arrival;

        let rank = line.line.range(..arrival).count() as u64;
        Ok(QueuePosition::new(rank, line.line.len() as u64))
    }

    async fn admit_if_head(
        &self,
        group: EventId,
        claimant: &ClaimantId,
    ) -> AppResult<AdmissionOutcome> {
        let Some(cell) = self.existing_group(group) else {
            return Ok(AdmissionOutcome::NotHead);
        };
        let admitted = {
            let mut line = cell.lock().await;
            let is_head = line
                .line
                .first_key_value()
                .is_some_and(|(_, head)| head == claimant);
            is_head && line.remove(claimant)
        };
        drop(cell);

        if !admitted {
            return Ok(AdmissionOutcome::NotHead);
        }
        self.prune_if_empty(group);
        Ok(AdmissionOutcome::Admitted)
    }

    async fn leave(&self, group: EventId, claimant: &ClaimantId) -> AppResult<bool> {
        let Some(cell) = self.existing_group(group) else {
            return Ok(false);
        };
        let removed = cell.lock().await.remove(claimant);
        drop(cell);

        if removed {
            self.prune_if_empty(group);
        }
        Ok(removed)
    }

    async fn evict_idle(&self, group: EventId, cutoff: DateTime<Utc>) -> AppResult<Vec<ClaimantId>> {
        let Some(cell) = self.existing_group(group) else {
            return Ok(Vec::new());
        };
        let stale = {
            let mut line = cell.lock().await;
            let stale: Vec<ClaimantId> = line
                .members
                .values()
                .filter(|entry| entry.last_seen_at < cutoff)
                .map(|entry| entry.claimant_id.clone())
                .collect();
            for claimant in &stale {
                line.remove(claimant);
            }
            stale
        };
        drop(cell);

        if !stale.is_empty() {
            self.prune_if_empty(group);
        }
        Ok(stale)
    }

    async fn groups(&self) -> AppResult<Vec<EventId>> {
        let cells: Vec<(EventId, Arc<Mutex<GroupLine>>)> = self
            .groups
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        let mut active = Vec::new();
        for (group, cell) in cells {
            if !cell.lock().await.line.is_empty() {
                active.push(group);
            }
        }
        Ok(active)
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }
}
