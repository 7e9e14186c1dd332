//! Unified application error types for BoxOffice.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. The reservation outcomes
//! (`ResourceUnavailable`, `HoldNotFound`, ...) are ordinary business
//! results reported to the caller; only `StoreUnavailable` is retryable.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested resource, event, or hold does not exist.
    NotFound,
    /// Input validation failed.
    Validation,
    /// The resource is already held or committed.
    ResourceUnavailable,
    /// No ACTIVE hold exists for the resource and claimant.
    HoldNotFound,
    /// The hold's TTL elapsed before the operation.
    HoldExpired,
    /// The hold belongs to a different claimant.
    OwnerMismatch,
    /// The claimant is not at the head of the admission queue.
    NotHead,
    /// The backing store could not be reached or failed transiently.
    StoreUnavailable,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal server error occurred.
    Internal,
}

impl ErrorKind {
    /// Whether a caller may retry the operation unchanged.
    ///
    /// Business outcomes are never retried: auto-retrying a losing claim
    /// would silently take a slot from whoever won it.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::ResourceUnavailable => write!(f, "RESOURCE_UNAVAILABLE"),
            Self::HoldNotFound => write!(f, "HOLD_NOT_FOUND"),
            Self::HoldExpired => write!(f, "HOLD_EXPIRED"),
            Self::OwnerMismatch => write!(f, "OWNER_MISMATCH"),
            Self::NotHead => write!(f, "NOT_HEAD"),
            Self::StoreUnavailable => write!(f, "STORE_UNAVAILABLE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout BoxOffice.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a resource-unavailable error.
    pub fn resource_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceUnavailable, message)
    }

    /// Create a hold-not-found error.
    pub fn hold_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::HoldNotFound, message)
    }

    /// Create a hold-expired error.
    pub fn hold_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::HoldExpired, message)
    }

    /// Create an owner-mismatch error.
    pub fn owner_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OwnerMismatch, message)
    }

    /// Create a not-head error.
    pub fn not_head(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotHead, message)
    }

    /// Create a store-unavailable error.
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StoreUnavailable, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether the caller may retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::with_source(
            ErrorKind::StoreUnavailable,
            format!("Database error: {err}"),
            err,
        )
    }
}

/// Body of every error response returned by the HTTP API.
#[cfg(feature = "axum")]
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Whether the same request may succeed if retried.
    pub retryable: bool,
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match self.kind {
            ErrorKind::NotFound | ErrorKind::HoldNotFound => StatusCode::NOT_FOUND,
            ErrorKind::ResourceUnavailable
            | ErrorKind::HoldExpired
            | ErrorKind::OwnerMismatch
            | ErrorKind::NotHead => StatusCode::CONFLICT,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::StoreUnavailable => {
                tracing::warn!(error = %self, "Backing store unavailable");
                StatusCode::SERVICE_UNAVAILABLE
            }
            ErrorKind::Configuration | ErrorKind::Serialization | ErrorKind::Internal => {
                tracing::error!(error = %self, "Internal server error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ApiErrorResponse {
            error: self.kind.to_string(),
            message: self.message.clone(),
            retryable: self.is_retryable(),
        };

        (status, axum::Json(body)).into_response()
    }
}
