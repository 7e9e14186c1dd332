//! Redis key builders for reservation and queue state.
//!
//! Keys are relative; [`RedisClient::prefixed_key`](crate::RedisClient::prefixed_key)
//! applies the deployment prefix.

use std::fmt::Display;

// ── Reservation keys ───────────────────────────────────────

/// Versioned slot document (resource + active hold) for one resource.
pub fn resource_slot(resource_id: impl Display) -> String {
    format!("slot:{resource_id}")
}

/// Ordered list of resource IDs registered under an event.
pub fn event_resources(event_id: impl Display) -> String {
    format!("event:{event_id}:resources")
}

/// A hold document by ID (kept after the hold closes).
pub fn hold(hold_id: impl Display) -> String {
    format!("hold:{hold_id}")
}

/// Sorted set of active hold IDs scored by expiry (unix millis).
pub fn hold_expiry_index() -> String {
    "holds:expiry".to_string()
}

// ── Queue keys ─────────────────────────────────────────────

/// Sorted set of waiting claimants scored by arrival rank.
pub fn queue_line(group: impl Display) -> String {
    format!("queue:{group}:line")
}

/// Per-group arrival sequence counter.
pub fn queue_sequence(group: impl Display) -> String {
    format!("queue:{group}:seq")
}

/// Sorted set of waiting claimants scored by last activity (unix millis).
pub fn queue_seen(group: impl Display) -> String {
    format!("queue:{group}:seen")
}

/// Set of groups that currently have a queue.
pub fn queue_groups() -> String {
    "queue:groups".to_string()
}
