//! # boxoffice-realtime
//!
//! Change notifier: per-event fan-out of resource state changes to live
//! subscribers (the SSE streams). Every subscriber has a bounded buffer and
//! publication never waits; a saturated subscriber misses updates instead
//! of stalling the publisher.

pub mod channel;
pub mod metrics;

pub use channel::{ChangeNotifier, Subscription, SubscriberId};
pub use metrics::{NotifierMetrics, NotifierMetricsSnapshot};
