//! Repository implementations for resources and holds.

pub mod hold;
pub mod resource;

pub use hold::HoldRepository;
pub use resource::ResourceRepository;
