//! Typed path parameter helpers.

use std::str::FromStr;

use boxoffice_core::error::AppError;
use boxoffice_core::types::{EventId, HoldId, ResourceId};

fn parse_id<T: FromStr>(kind: &str, raw: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::validation(format!("Invalid {kind} id: {raw}")))
}

/// Parses a resource id from a path segment.
pub fn parse_resource_id(raw: &str) -> Result<ResourceId, AppError> {
    parse_id("resource", raw)
}

/// Parses a hold id from a path segment.
pub fn parse_hold_id(raw: &str) -> Result<HoldId, AppError> {
    parse_id("hold", raw)
}

/// Parses an event (group) id from a path segment.
pub fn parse_event_id(raw: &str) -> Result<EventId, AppError> {
    parse_id("event", raw)
}
