//! Admission service: the queue operations exposed to callers.

use std::sync::Arc;

use tracing::{debug, info};

use boxoffice_core::error::AppError;
use boxoffice_core::result::AppResult;
use boxoffice_core::types::{ClaimantId, EventId};
use boxoffice_entity::queue::{AdmissionOutcome, JoinReceipt, QueuePosition};

use crate::queue::AdmissionQueue;

/// Caller-facing wrapper around an [`AdmissionQueue`].
///
/// Turns a `NotHead` outcome into an error so HTTP handlers can report it
/// like every other business rejection.
#[derive(Debug, Clone)]
pub struct AdmissionService {
    queue: Arc<dyn AdmissionQueue>,
}

impl AdmissionService {
    /// Create a new admission service.
    pub fn new(queue: Arc<dyn AdmissionQueue>) -> Self {
        Self { queue }
    }

    /// Join the line for `group`.
    pub async fn join(&self, group: EventId, claimant: &ClaimantId) -> AppResult<JoinReceipt> {
        let receipt = self.queue.join(group, claimant).await?;
        if receipt.rejoined {
            debug!(group = %group, claimant = %claimant, rank = receipt.rank, "Claimant rejoined");
        } else {
            info!(group = %group, claimant = %claimant, rank = receipt.rank, "Claimant joined queue");
        }
        Ok(receipt)
    }

    /// Current place in line.
    pub async fn position(&self, group: EventId, claimant: &ClaimantId) -> AppResult<QueuePosition> {
        self.queue.position(group, claimant).await
    }

    /// Admit `claimant` if it is at the head, otherwise fail with `NotHead`.
    pub async fn admit(&self, group: EventId, claimant: &ClaimantId) -> AppResult<()> {
        match self.queue.admit_if_head(group, claimant).await? {
            AdmissionOutcome::Admitted => {
                info!(group = %group, claimant = %claimant, "Claimant admitted");
                Ok(())
            }
            AdmissionOutcome::NotHead => {
                debug!(group = %group, claimant = %claimant, "Admission refused, not at head");
                Err(AppError::not_head(format!(
                    "Claimant {claimant} is not at the head of the queue"
                )))
            }
        }
    }

    /// Leave the line. Returns whether the claimant was waiting.
    pub async fn leave(&self, group: EventId, claimant: &ClaimantId) -> AppResult<bool> {
        let removed = self.queue.leave(group, claimant).await?;
        if removed {
            info!(group = %group, claimant = %claimant, "Claimant left queue");
        }
        Ok(removed)
    }

    /// Check the backing store.
    pub async fn health_check(&self) -> AppResult<()> {
        self.queue.health_check().await
    }
}
