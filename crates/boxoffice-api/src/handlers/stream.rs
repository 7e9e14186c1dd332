//! Server-Sent Events stream of resource changes for one group.

use std::collections::HashMap;
use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::Utc;
use futures::stream::{self, Stream, StreamExt};
use tracing::{debug, warn};

use boxoffice_core::error::AppError;
use boxoffice_core::events::ChangeEvent;
use boxoffice_core::types::ResourceId;
use boxoffice_entity::resource::Resource;

use crate::dto::response::GroupSnapshot;
use crate::extractors::parse_event_id;
use crate::state::AppState;

/// SSE event name of the initial group snapshot.
pub const SNAPSHOT_EVENT: &str = "snapshot";
/// SSE event name of each incremental change.
pub const CHANGE_EVENT: &str = "change";

/// GET /groups/{id}/stream
///
/// Sends a `snapshot` event with every resource of the group, then one
/// `change` event per published transition. The subscription is taken
/// before the snapshot is read, so no change falls between the two.
/// Changes no newer than what the client already saw (by resource
/// revision) are skipped. Closing the connection drops the subscription.
pub async fn stream_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let group = parse_event_id(&id)?;

    let subscription = state.notifier.subscribe(group);
    let resources = state.reservations.list_resources(group).await?;
    debug!(
        group = %group,
        subscriber_id = %subscription.id(),
        resources = resources.len(),
        "Change stream opened"
    );

    let snapshot = GroupSnapshot {
        event_id: group,
        resources: resources.iter().map(Resource::snapshot).collect(),
        taken_at: Utc::now(),
    };
    let first = Event::default()
        .event(SNAPSHOT_EVENT)
        .json_data(&snapshot)
        .map_err(|e| AppError::internal(format!("Failed to encode snapshot: {e}")))?;

    let mut seen = RevisionTracker::from_resources(&resources);
    let changes = subscription.filter_map(move |change| {
        let event = if seen.advance(&change) {
            match Event::default().event(CHANGE_EVENT).json_data(&*change) {
                Ok(event) => Some(Ok::<_, Infallible>(event)),
                Err(e) => {
                    warn!(error = %e, "Dropping change that failed to encode");
                    None
                }
            }
        } else {
            debug!(group = %change.event_id, kind = ?change.kind, "Skipping stale change");
            None
        };
        async move { event }
    });

    let keep_alive = Duration::from_secs(state.config.realtime.keep_alive_seconds.max(1));
    Ok(Sse::new(stream::once(async move { Ok::<_, Infallible>(first) }).chain(changes))
        .keep_alive(KeepAlive::new().interval(keep_alive)))
}

/// Latest revision the client has seen per resource.
#[derive(Debug, Default)]
struct RevisionTracker {
    latest: HashMap<ResourceId, i64>,
}

impl RevisionTracker {
    fn from_resources(resources: &[Resource]) -> Self {
        Self {
            latest: resources.iter().map(|r| (r.id, r.revision)).collect(),
        }
    }

    /// Record `change` and report whether it carries anything newer.
    fn advance(&mut self, change: &ChangeEvent) -> bool {
        let mut fresh = false;
        for snapshot in &change.resources {
            let latest = self.latest.entry(snapshot.id).or_insert(-1);
            if snapshot.revision > *latest {
                *latest = snapshot.revision;
                fresh = true;
            }
        }
        fresh
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use boxoffice_core::events::{ChangeKind, ResourceSnapshot};
    use boxoffice_core::types::{EventId, ResourceStatus};

    use super::*;

    fn change(resource: &Resource, status: ResourceStatus, revision: i64) -> ChangeEvent {
        let at = DateTime::<Utc>::from_timestamp(1_700_000_000 + revision, 0).unwrap();
        ChangeEvent {
            event_id: resource.event_id,
            kind: ChangeKind::Claimed,
            hold_id: None,
            resources: vec![ResourceSnapshot {
                status,
                updated_at: at,
                revision,
                ..resource.snapshot()
            }],
            occurred_at: at,
        }
    }

    #[test]
    fn late_older_change_is_skipped() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let resource = Resource::new(EventId::new(), "A-1", now);
        let mut tracker = RevisionTracker::from_resources(std::slice::from_ref(&resource));

        // released (rev 2) delivered before the claim (rev 1) that preceded it
        assert!(tracker.advance(&change(&resource, ResourceStatus::Available, 2)));
        assert!(!tracker.advance(&change(&resource, ResourceStatus::Held, 1)));
        assert!(tracker.advance(&change(&resource, ResourceStatus::Held, 3)));
    }

    #[test]
    fn changes_already_in_snapshot_are_skipped() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut resource = Resource::new(EventId::new(), "A-1", now);
        resource.transition(ResourceStatus::Held, now);
        let mut tracker = RevisionTracker::from_resources(std::slice::from_ref(&resource));

        assert!(!tracker.advance(&change(&resource, ResourceStatus::Held, 1)));

        let unknown = Resource::new(resource.event_id, "A-2", now);
        assert!(tracker.advance(&change(&unknown, ResourceStatus::Available, 0)));
    }
}
