//! Admission queue trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use boxoffice_core::result::AppResult;
use boxoffice_core::types::{ClaimantId, EventId};
use boxoffice_entity::queue::{AdmissionOutcome, JoinReceipt, QueuePosition};

/// Per-group FIFO gate admitting one claimant at a time.
///
/// Operations on one group are linearizable with respect to the head of
/// the line. Concurrent joins by different claimants each receive a
/// distinct, correctly ordered arrival rank.
#[async_trait]
pub trait AdmissionQueue: Send + Sync + std::fmt::Debug {
    /// Enqueue `claimant`, or return its existing rank if already waiting.
    async fn join(&self, group: EventId, claimant: &ClaimantId) -> AppResult<JoinReceipt>;

    /// Zero-based place in line. Fails with `NotFound` if not waiting.
    async fn position(&self, group: EventId, claimant: &ClaimantId) -> AppResult<QueuePosition>;

    /// Remove `claimant` if, and only if, it is at the head.
    async fn admit_if_head(
        &self,
        group: EventId,
        claimant: &ClaimantId,
    ) -> AppResult<AdmissionOutcome>;

    /// Remove `claimant` wherever it is. Returns whether it was waiting.
    async fn leave(&self, group: EventId, claimant: &ClaimantId) -> AppResult<bool>;

    /// Remove every claimant last seen before `cutoff`.
    async fn evict_idle(&self, group: EventId, cutoff: DateTime<Utc>) -> AppResult<Vec<ClaimantId>>;

    /// Groups that currently have waiting claimants.
    async fn groups(&self) -> AppResult<Vec<EventId>>;

    /// Check that the backing store is reachable.
    async fn health_check(&self) -> AppResult<()>;
}
