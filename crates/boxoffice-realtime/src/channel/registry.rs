//! Change notifier: subscriber registry keyed by event.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use boxoffice_core::events::ChangeEvent;
use boxoffice_core::traits::ChangePublisher;
use boxoffice_core::types::EventId;

use crate::metrics::NotifierMetrics;

use super::subscription::{SubscriberId, Subscription};

/// Sending half of one subscription.
#[derive(Debug)]
struct Subscriber {
    id: SubscriberId,
    sender: mpsc::Sender<Arc<ChangeEvent>>,
    subscribed_at: DateTime<Utc>,
}

/// Registry of live subscribers per event.
#[derive(Debug)]
pub struct ChangeNotifier {
    /// Event → subscribers, in subscription order.
    groups: DashMap<EventId, Vec<Subscriber>>,
    /// Subscriber → event (reverse index).
    index: DashMap<SubscriberId, EventId>,
    /// Per-subscriber buffer capacity.
    buffer_size: usize,
    metrics: NotifierMetrics,
}

impl ChangeNotifier {
    /// Create a notifier whose subscribers buffer up to `buffer_size`
    /// undelivered changes each.
    pub fn new(buffer_size: usize) -> Arc<Self> {
        Arc::new(Self {
            groups: DashMap::new(),
            index: DashMap::new(),
            buffer_size: buffer_size.max(1),
            metrics: NotifierMetrics::default(),
        })
    }

    /// Subscribe to changes of `group`.
    pub fn subscribe(self: &Arc<Self>, group: EventId) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.buffer_size);
        let id = Uuid::new_v4();

        self.groups.entry(group).or_default().push(Subscriber {
            id,
            sender,
            subscribed_at: Utc::now(),
        });
        self.index.insert(id, group);

        debug!(subscriber_id = %id, event_id = %group, "Subscriber added");
        Subscription::new(id, group, receiver, Arc::downgrade(self))
    }

    /// Remove a subscriber. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let Some((_, group)) = self.index.remove(&id) else {
            return false;
        };

        if let Some(mut subscribers) = self.groups.get_mut(&group) {
            if let Some(pos) = subscribers.iter().position(|s| s.id == id) {
                let removed = subscribers.remove(pos);
                debug!(
                    subscriber_id = %id,
                    event_id = %group,
                    connected_for_ms = (Utc::now() - removed.subscribed_at).num_milliseconds(),
                    "Subscriber removed"
                );
            }
            if subscribers.is_empty() {
                drop(subscribers);
                self.groups.remove_if(&group, |_, subs| subs.is_empty());
            }
        }
        true
    }

    /// Hand `change` to every subscriber of `group` without waiting.
    ///
    /// A subscriber whose buffer is full misses this change; one whose
    /// receiver is gone is removed. Returns the number of deliveries.
    pub fn publish(&self, group: &EventId, change: ChangeEvent) -> usize {
        self.metrics.record_published();
        let Some(mut subscribers) = self.groups.get_mut(group) else {
            return 0;
        };

        let change = Arc::new(change);
        let mut delivered = 0;
        subscribers.retain(|subscriber| {
            match subscriber.sender.try_send(Arc::clone(&change)) {
                Ok(()) => {
                    delivered += 1;
                    self.metrics.record_delivered();
                    true
                }
                Err(TrySendError::Full(_)) => {
                    warn!(
                        subscriber_id = %subscriber.id,
                        event_id = %group,
                        "Subscriber buffer full, dropping change"
                    );
                    self.metrics.record_dropped();
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    self.index.remove(&subscriber.id);
                    self.metrics.record_pruned();
                    false
                }
            }
        });

        if subscribers.is_empty() {
            drop(subscribers);
            self.groups.remove_if(group, |_, subs| subs.is_empty());
        }
        delivered
    }

    /// Live subscribers of `group`.
    pub fn subscriber_count(&self, group: &EventId) -> usize {
        self.groups.get(group).map(|subs| subs.len()).unwrap_or(0)
    }

    /// Live subscribers across all events.
    pub fn total_subscribers(&self) -> usize {
        self.index.len()
    }

    /// Delivery counters.
    pub fn metrics(&self) -> &NotifierMetrics {
        &self.metrics
    }
}

impl ChangePublisher for ChangeNotifier {
    fn publish(&self, group: &EventId, change: ChangeEvent) -> usize {
        ChangeNotifier::publish(self, group, change)
    }
}
