//! The unit of atomic update: one resource plus its active hold.

use std::time::Duration;

use chrono::{DateTime, Utc};

use boxoffice_core::error::AppError;
use boxoffice_core::result::AppResult;
use boxoffice_core::types::{ClaimantId, HoldStatus, ResourceStatus};
use boxoffice_entity::hold::Hold;
use boxoffice_entity::resource::Resource;

/// A resource and its `Active` hold, as seen inside one atomic update.
///
/// The only mutators are [`Slot::open_hold`] and [`Slot::close_hold`], which
/// keep the resource status and the hold lifecycle in step. Every hold they
/// touch is recorded so the store can persist it.
#[derive(Debug, Clone)]
pub struct Slot {
    resource: Resource,
    active: Option<Hold>,
    written: Vec<Hold>,
}

impl Slot {
    /// Wrap the persisted state of one resource.
    pub fn new(resource: Resource, active: Option<Hold>) -> Self {
        Self {
            resource,
            active,
            written: Vec::new(),
        }
    }

    /// The resource.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// The resource's `Active` hold, expired or not.
    pub fn active_hold(&self) -> Option<&Hold> {
        self.active.as_ref()
    }

    /// Holds created or closed by this update, in the order they changed.
    pub fn written_holds(&self) -> &[Hold] {
        &self.written
    }

    /// Whether anything needs persisting.
    pub fn is_dirty(&self) -> bool {
        !self.written.is_empty()
    }

    /// Claim the resource: `Available` to `Held` with a new `Active` hold.
    pub fn open_hold(
        &mut self,
        claimant: ClaimantId,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> AppResult<Hold> {
        if self.active.is_some() || !self.resource.is_available() {
            return Err(AppError::resource_unavailable(format!(
                "Resource {} is {}",
                self.resource.id, self.resource.status
            )));
        }

        let hold = Hold::open(self.resource.id, claimant, now, ttl);
        self.resource.transition(ResourceStatus::Held, now);
        self.active = Some(hold.clone());
        self.record(hold.clone());
        Ok(hold)
    }

    /// Close the active hold with a terminal `status`.
    ///
    /// `Completed` commits the resource; any other status frees it.
    /// Returns `None` when there is no active hold.
    pub fn close_hold(&mut self, status: HoldStatus, at: DateTime<Utc>) -> Option<Hold> {
        let mut hold = self.active.take()?;
        hold.close(status, at);

        let next = match status {
            HoldStatus::Completed => ResourceStatus::Committed,
            _ => ResourceStatus::Available,
        };
        self.resource.transition(next, at);
        self.record(hold.clone());
        Some(hold)
    }

    fn record(&mut self, hold: Hold) {
        match self.written.iter_mut().find(|h| h.id == hold.id) {
            Some(existing) => *existing = hold,
            None => self.written.push(hold),
        }
    }
}
