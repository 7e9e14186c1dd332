//! Periodic task trait and task errors.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use boxoffice_core::error::AppError;

/// A unit of background work run on a fixed interval.
#[async_trait]
pub trait PeriodicTask: Send + Sync + std::fmt::Debug {
    /// Task name for logs.
    fn name(&self) -> &str;

    /// Time between the starts of consecutive cycles.
    fn interval(&self) -> Duration;

    /// Run one cycle, returning a summary for the log.
    async fn run_once(&self) -> Result<Value, TaskError>;
}

/// Error from a task cycle.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Permanent failure; the cycle will fail the same way next time
    #[error("Permanent task failure: {0}")]
    Permanent(String),

    /// Transient failure; the next cycle may succeed
    #[error("Transient task failure: {0}")]
    Transient(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}
