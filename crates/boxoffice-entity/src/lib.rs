//! # boxoffice-entity
//!
//! Persisted domain models: resources, holds, and admission queue entries.

pub mod hold;
pub mod queue;
pub mod resource;

pub use hold::Hold;
pub use queue::{AdmissionOutcome, JoinReceipt, QueueEntry, QueuePosition};
pub use resource::Resource;
