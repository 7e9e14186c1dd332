//! Admission queue entities and outcomes.

pub mod model;

pub use model::{AdmissionOutcome, JoinReceipt, QueueEntry, QueuePosition};
