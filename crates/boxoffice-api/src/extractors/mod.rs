//! Custom Axum extractors.

pub mod json;
pub mod path;

pub use json::ValidatedJson;
pub use path::{parse_event_id, parse_hold_id, parse_resource_id};
