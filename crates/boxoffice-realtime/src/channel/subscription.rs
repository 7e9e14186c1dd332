//! Subscription handle.

use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use uuid::Uuid;

use boxoffice_core::events::ChangeEvent;
use boxoffice_core::types::EventId;

use super::registry::ChangeNotifier;

/// Unique subscriber identifier.
pub type SubscriberId = Uuid;

/// A live subscription to one event's changes.
///
/// Changes arrive in publish order. Dropping the handle unsubscribes, so a
/// disconnected stream releases its slot immediately.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    group: EventId,
    receiver: mpsc::Receiver<Arc<ChangeEvent>>,
    notifier: Weak<ChangeNotifier>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriberId,
        group: EventId,
        receiver: mpsc::Receiver<Arc<ChangeEvent>>,
        notifier: Weak<ChangeNotifier>,
    ) -> Self {
        Self {
            id,
            group,
            receiver,
            notifier,
        }
    }

    /// This subscriber's id.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// The subscribed event.
    pub fn group(&self) -> EventId {
        self.group
    }

    /// Wait for the next change. `None` once unsubscribed and drained.
    pub async fn recv(&mut self) -> Option<Arc<ChangeEvent>> {
        self.receiver.recv().await
    }

    /// Take a change if one is already buffered.
    pub fn try_recv(&mut self) -> Option<Arc<ChangeEvent>> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = Arc<ChangeEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(notifier) = self.notifier.upgrade() {
            notifier.unsubscribe(self.id);
        }
    }
}
