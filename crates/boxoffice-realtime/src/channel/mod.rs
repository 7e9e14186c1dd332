//! Per-event subscriber registry and subscription handles.

pub mod registry;
pub mod subscription;

pub use registry::ChangeNotifier;
pub use subscription::{Subscription, SubscriberId};
