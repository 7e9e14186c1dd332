//! Hold entity model.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use boxoffice_core::types::{ClaimantId, HoldId, HoldStatus, ResourceId};

/// A time-bounded claim on one resource by one claimant.
///
/// A resource has at most one `Active` hold at any instant. Once a hold
/// leaves `Active` it is never modified again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Hold {
    /// Unique hold identifier.
    pub id: HoldId,
    /// The held resource.
    pub resource_id: ResourceId,
    /// Who holds it.
    pub claimant_id: ClaimantId,
    /// Lifecycle status.
    pub status: HoldStatus,
    /// When the hold was created.
    pub created_at: DateTime<Utc>,
    /// Absolute expiry; the hold cannot be committed at or after this time.
    pub expires_at: DateTime<Utc>,
    /// When the hold left `Active`.
    pub closed_at: Option<DateTime<Utc>>,
}

impl Hold {
    /// Open a new active hold expiring `ttl` after `now`.
    pub fn open(
        resource_id: ResourceId,
        claimant_id: ClaimantId,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            id: HoldId::new(),
            resource_id,
            claimant_id,
            status: HoldStatus::Active,
            created_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            closed_at: None,
        }
    }

    /// Whether the hold is still `Active` (regardless of expiry).
    pub fn is_active(&self) -> bool {
        self.status == HoldStatus::Active
    }

    /// Whether the TTL has elapsed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether `claimant` owns this hold.
    pub fn is_owned_by(&self, claimant: &ClaimantId) -> bool {
        &self.claimant_id == claimant
    }

    /// Transition out of `Active` into a terminal status.
    pub fn close(&mut self, status: HoldStatus, at: DateTime<Utc>) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.closed_at = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_boundary_is_exclusive() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let hold = Hold::open(
            ResourceId::new(),
            ClaimantId::parse("x").unwrap(),
            now,
            Duration::from_secs(300),
        );
        assert!(!hold.is_expired_at(now + chrono::Duration::seconds(299)));
        assert!(hold.is_expired_at(now + chrono::Duration::seconds(300)));
        assert!(hold.is_active());
    }
}
