//! # boxoffice-reservation
//!
//! The reservation manager and its state stores.
//!
//! [`ReservationManager`] implements claim, commit, release, and expiry on
//! top of a [`ReservationStore`], which provides one primitive: load a
//! resource together with its active hold, let the caller mutate it, and
//! persist the result all-or-nothing. Three stores implement it:
//!
//! - **memory**: per-resource `tokio` mutexes (single node)
//! - **postgres**: `SELECT ... FOR UPDATE` inside a transaction
//! - **redis**: versioned documents updated by a compare-and-set Lua script

pub mod manager;
pub mod store;

pub use manager::ReservationManager;
pub use store::{ReservationStore, ReservationStoreDispatch, Slot};
