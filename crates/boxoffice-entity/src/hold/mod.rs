//! Hold (reservation) entity.

pub mod model;

pub use model::Hold;
