//! Domain events published to change-stream observers.

pub mod change;

pub use change::{ChangeEvent, ChangeKind, ResourceSnapshot};
