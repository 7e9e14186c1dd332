//! # boxoffice-queue
//!
//! Admission queue: claimants join a per-event line and are admitted one at
//! a time, strictly in arrival order. The head check and removal in
//! [`AdmissionQueue::admit_if_head`] is one atomic step in every backend:
//!
//! - **memory**: an ordered map per group behind a Tokio mutex
//! - **redis**: sorted sets updated by Lua scripts

pub mod dispatch;
pub mod memory;
pub mod queue;
pub mod redis;
pub mod service;

pub use dispatch::AdmissionQueueDispatch;
pub use memory::MemoryAdmissionQueue;
pub use queue::AdmissionQueue;
pub use self::redis::RedisAdmissionQueue;
pub use service::AdmissionService;
