//! Route handlers organized by domain.

pub mod health;
pub mod queue;
pub mod reservation;
pub mod resource;
pub mod stream;
