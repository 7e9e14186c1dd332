//! Change publication seam between state owners and observers.

use crate::events::ChangeEvent;
use crate::types::id::EventId;

/// Sink for resource state-change events.
///
/// Publication must never block the caller: implementations deliver
/// best-effort and drop updates for saturated listeners.
pub trait ChangePublisher: Send + Sync + std::fmt::Debug + 'static {
    /// Publish a change to every listener of `group`.
    ///
    /// Returns the number of listeners the change was handed to.
    fn publish(&self, group: &EventId, change: ChangeEvent) -> usize;
}
