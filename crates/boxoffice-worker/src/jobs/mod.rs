//! Built-in periodic tasks.

pub mod queue_idle;
pub mod reclaim;

pub use queue_idle::QueueIdleEvictor;
pub use reclaim::{ExpiryReclaimer, SweepReport};
