//! Resource entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use boxoffice_core::events::ResourceSnapshot;
use boxoffice_core::types::{EventId, ResourceId, ResourceStatus};

/// A perishable unit under contention, owned by one event.
///
/// Mutated only by the reservation manager; never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Resource {
    /// Unique resource identifier.
    pub id: ResourceId,
    /// Owning event (group key for queues and change streams).
    pub event_id: EventId,
    /// Display label.
    pub label: String,
    /// Current status.
    pub status: ResourceStatus,
    /// When the resource was registered.
    pub created_at: DateTime<Utc>,
    /// Last status transition.
    pub updated_at: DateTime<Utc>,
    /// Bumped on every transition; orders changes to this resource.
    #[serde(default)]
    pub revision: i64,
}

impl Resource {
    /// Build a freshly registered, available resource.
    pub fn new(event_id: EventId, label: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: ResourceId::new(),
            event_id,
            label: label.into(),
            status: ResourceStatus::Available,
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    /// Whether the resource can be claimed.
    pub fn is_available(&self) -> bool {
        self.status == ResourceStatus::Available
    }

    /// Move to `status`, stamping the transition time and bumping the
    /// revision.
    pub fn transition(&mut self, status: ResourceStatus, at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = at;
        self.revision += 1;
    }

    /// Observer-facing snapshot.
    pub fn snapshot(&self) -> ResourceSnapshot {
        ResourceSnapshot {
            id: self.id,
            event_id: self.event_id,
            label: self.label.clone(),
            status: self.status,
            updated_at: self.updated_at,
            revision: self.revision,
        }
    }
}
