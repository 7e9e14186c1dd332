//! Background periodic tasks for BoxOffice.
//!
//! This crate provides:
//! - A worker runner that drives registered periodic tasks until shutdown
//! - The expiry reclaimer, which returns expired holds' resources to sale
//! - The queue idle evictor, which drops abandoned admission queue entries

pub mod jobs;
pub mod runner;
pub mod task;

pub use jobs::{ExpiryReclaimer, QueueIdleEvictor, SweepReport};
pub use runner::WorkerRunner;
pub use task::{PeriodicTask, TaskError};
