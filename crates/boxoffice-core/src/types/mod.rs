//! Shared value types: identifiers, claimant identity, lifecycle statuses.

pub mod claimant;
pub mod id;
pub mod status;

pub use claimant::ClaimantId;
pub use id::{EventId, HoldId, ResourceId};
pub use status::{HoldStatus, ResourceStatus};
