//! Resource state-change events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::id::{EventId, HoldId, ResourceId};
use crate::types::status::ResourceStatus;

/// What happened to the affected resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Resources were registered for the event.
    Registered,
    /// A hold was created.
    Claimed,
    /// A hold was committed; the resource is sold.
    Committed,
    /// A hold was released early by its owner.
    Released,
    /// A hold was reclaimed after its TTL elapsed.
    Expired,
}

/// Point-in-time view of one resource, as pushed to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// Resource id.
    pub id: ResourceId,
    /// Owning event.
    pub event_id: EventId,
    /// Display label (e.g. `"A-12"`).
    pub label: String,
    /// Current status.
    pub status: ResourceStatus,
    /// Last transition time.
    pub updated_at: DateTime<Utc>,
    /// Per-resource transition counter. Of two snapshots of the same
    /// resource, the higher revision is the newer state.
    pub revision: i64,
}

/// A state transition affecting one or more resources of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// The event (group) the resources belong to.
    pub event_id: EventId,
    /// Transition kind.
    pub kind: ChangeKind,
    /// Hold involved in the transition, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_id: Option<HoldId>,
    /// Snapshots of the affected resources after the transition.
    pub resources: Vec<ResourceSnapshot>,
    /// When the transition happened.
    pub occurred_at: DateTime<Utc>,
}
