//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use boxoffice_core::events::ResourceSnapshot;
use boxoffice_core::types::{
    ClaimantId, EventId, HoldId, HoldStatus, ResourceId, ResourceStatus,
};
use boxoffice_entity::hold::Hold;
use boxoffice_entity::queue::{JoinReceipt, QueuePosition};
use boxoffice_entity::resource::Resource;
use boxoffice_realtime::NotifierMetricsSnapshot;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Hold summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldResponse {
    /// Hold id.
    pub hold_id: HoldId,
    /// Held resource.
    pub resource_id: ResourceId,
    /// Owner.
    #[serde(rename = "claimantID")]
    pub claimant_id: ClaimantId,
    /// Lifecycle status.
    pub status: HoldStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,
    /// When the hold was completed, released, or expired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<Hold> for HoldResponse {
    fn from(hold: Hold) -> Self {
        Self {
            hold_id: hold.id,
            resource_id: hold.resource_id,
            claimant_id: hold.claimant_id,
            status: hold.status,
            created_at: hold.created_at,
            expires_at: hold.expires_at,
            closed_at: hold.closed_at,
        }
    }
}

/// Resource summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceResponse {
    /// Resource id.
    pub id: ResourceId,
    /// Owning event.
    pub event_id: EventId,
    /// Display label.
    pub label: String,
    /// Current status.
    pub status: ResourceStatus,
    /// Last transition time.
    pub updated_at: DateTime<Utc>,
    /// Transition counter.
    pub revision: i64,
}

impl From<Resource> for ResourceResponse {
    fn from(resource: Resource) -> Self {
        Self {
            id: resource.id,
            event_id: resource.event_id,
            label: resource.label,
            status: resource.status,
            updated_at: resource.updated_at,
            revision: resource.revision,
        }
    }
}

/// First message on a change stream: the whole group as it is now.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSnapshot {
    /// The subscribed group.
    pub event_id: EventId,
    /// Every resource of the group.
    pub resources: Vec<ResourceSnapshot>,
    /// When the snapshot was read.
    pub taken_at: DateTime<Utc>,
}

/// Join result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinResponse {
    /// Arrival rank; stable while the claimant stays in line.
    pub rank: u64,
    /// Whether the claimant was already waiting.
    pub rejoined: bool,
}

impl From<JoinReceipt> for JoinResponse {
    fn from(receipt: JoinReceipt) -> Self {
        Self {
            rank: receipt.rank,
            rejoined: receipt.rejoined,
        }
    }
}

/// Place in line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionResponse {
    /// Zero-based index.
    pub rank: u64,
    /// Claimants waiting.
    pub total: u64,
    /// Whether the claimant would be admitted now.
    pub is_head: bool,
}

impl From<QueuePosition> for PositionResponse {
    fn from(position: QueuePosition) -> Self {
        Self {
            rank: position.rank,
            total: position.total,
            is_head: position.is_head,
        }
    }
}

/// Successful admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmitResponse {
    /// Always `"admitted"`.
    pub outcome: String,
}

/// Leave result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveResponse {
    /// Whether the claimant was waiting.
    pub removed: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` or `"degraded"`.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Reservation store backend and reachability.
    pub reservation: ComponentHealth,
    /// Admission queue backend and reachability.
    pub queue: ComponentHealth,
    /// Live change stream subscribers.
    pub subscribers: usize,
    /// Change notifier delivery counters since startup.
    pub notifier: NotifierMetricsSnapshot,
}

/// One backend's health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Backend name (`memory`, `postgres`, `redis`).
    pub backend: String,
    /// Whether the last check succeeded.
    pub healthy: bool,
    /// Failure detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
