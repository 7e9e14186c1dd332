//! Admission queue models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use boxoffice_core::types::ClaimantId;

/// One waiting claimant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// The waiting claimant.
    pub claimant_id: ClaimantId,
    /// Arrival rank: a sequence number, strictly increasing in join order
    /// within a group.
    pub arrival: u64,
    /// First join time.
    pub joined_at: DateTime<Utc>,
    /// Last join/position call, used by idle eviction.
    pub last_seen_at: DateTime<Utc>,
}

/// Result of a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinReceipt {
    /// The claimant's arrival rank; unchanged by repeated joins.
    pub rank: u64,
    /// True when the claimant was already enqueued.
    pub rejoined: bool,
}

/// A claimant's place in line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuePosition {
    /// Zero-based index in arrival order.
    pub rank: u64,
    /// Number of claimants currently waiting.
    pub total: u64,
    /// `rank == 0`.
    pub is_head: bool,
}

impl QueuePosition {
    /// Build a position from a zero-based index.
    pub fn new(rank: u64, total: u64) -> Self {
        Self {
            rank,
            total,
            is_head: rank == 0,
        }
    }
}

/// Result of an admit-if-head attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionOutcome {
    /// The claimant was at the head and has been removed from the queue.
    Admitted,
    /// Someone else is ahead; nothing changed.
    NotHead,
}
