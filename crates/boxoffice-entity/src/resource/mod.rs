//! Resource (seat/ticket) entity.

pub mod model;

pub use model::Resource;
