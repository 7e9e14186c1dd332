//! Request DTOs with validation.
//!
//! Field names follow the public wire format (`claimantID`, `ttlSeconds`);
//! snake_case aliases are accepted as well.

use serde::{Deserialize, Serialize};
use validator::Validate;

use boxoffice_core::error::AppError;
use boxoffice_core::types::ClaimantId;

/// Claim (reserve) request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ClaimRequest {
    /// Who is claiming.
    #[serde(rename = "claimantID", alias = "claimant_id")]
    #[validate(length(min = 1, max = 128, message = "claimantID is required"))]
    pub claimant_id: String,
    /// Hold lifetime; the configured default when omitted.
    #[serde(rename = "ttlSeconds", alias = "ttl_seconds", default)]
    #[validate(range(min = 1, message = "ttlSeconds must be positive"))]
    pub ttl_seconds: Option<u64>,
}

impl ClaimRequest {
    /// Parsed claimant.
    pub fn claimant(&self) -> Result<ClaimantId, AppError> {
        ClaimantId::parse(self.claimant_id.as_str())
    }
}

/// Body carrying only a claimant: commit, release, join, admit, leave.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ClaimantRequest {
    /// The acting claimant.
    #[serde(rename = "claimantID", alias = "claimant_id")]
    #[validate(length(min = 1, max = 128, message = "claimantID is required"))]
    pub claimant_id: String,
}

impl ClaimantRequest {
    /// Parsed claimant.
    pub fn claimant(&self) -> Result<ClaimantId, AppError> {
        ClaimantId::parse(self.claimant_id.as_str())
    }
}

/// `?claimantID=` query string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimantQuery {
    /// The claimant to look up.
    #[serde(rename = "claimantID", alias = "claimant_id")]
    pub claimant_id: String,
}

impl ClaimantQuery {
    /// Parsed claimant.
    pub fn claimant(&self) -> Result<ClaimantId, AppError> {
        ClaimantId::parse(self.claimant_id.as_str())
    }
}

/// Register resources for an event.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterResourcesRequest {
    /// Display labels, one resource per label.
    #[validate(length(min = 1, max = 1000, message = "Between 1 and 1000 labels are required"))]
    pub labels: Vec<String>,
}
