//! Core traits defined in `boxoffice-core` and implemented by other crates.

pub mod clock;
pub mod publisher;

pub use clock::{Clock, ManualClock, SystemClock};
pub use publisher::ChangePublisher;
