//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! TOML files and `BOXOFFICE__` environment variables. Each sub-module
//! represents a logical configuration section, and every field carries a
//! default so that an empty configuration starts an in-memory server.

pub mod app;
pub mod database;
pub mod logging;
pub mod queue;
pub mod realtime;
pub mod redis;
pub mod reservation;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::app::ServerConfig;
pub use self::database::DatabaseConfig;
pub use self::logging::{LogFormat, LoggingConfig};
pub use self::queue::{QueueBackend, QueueConfig};
pub use self::realtime::RealtimeConfig;
pub use self::redis::RedisConfig;
pub use self::reservation::{ReservationBackend, ReservationConfig};
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// PostgreSQL settings (used by the `postgres` reservation backend).
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Redis settings (used by the `redis` backends).
    #[serde(default)]
    pub redis: RedisConfig,
    /// Reservation manager settings.
    #[serde(default)]
    pub reservation: ReservationConfig,
    /// Admission queue settings.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Change notifier settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Background worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration for the given environment name.
    ///
    /// Merges `config/default.toml`, the `config/{env}.toml` overlay, and
    /// environment variables prefixed with `BOXOFFICE__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("BOXOFFICE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would violate runtime invariants.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.reservation.default_ttl_seconds == 0 {
            return Err(AppError::configuration(
                "reservation.default_ttl_seconds must be greater than zero",
            ));
        }
        if self.reservation.default_ttl_seconds > self.reservation.max_ttl_seconds {
            return Err(AppError::configuration(
                "reservation.default_ttl_seconds must not exceed reservation.max_ttl_seconds",
            ));
        }
        if self.realtime.subscriber_buffer_size == 0 {
            return Err(AppError::configuration(
                "realtime.subscriber_buffer_size must be greater than zero",
            ));
        }
        if self.worker.sweep_interval_seconds == 0 {
            return Err(AppError::configuration(
                "worker.sweep_interval_seconds must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.reservation.backend, ReservationBackend::Memory);
        assert_eq!(config.reservation.default_ttl_seconds, 600);
        assert_eq!(config.queue.backend, QueueBackend::Memory);
        assert_eq!(config.queue.idle_timeout_seconds, 0);
        assert_eq!(config.worker.sweep_interval_seconds, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn ttl_above_maximum_is_rejected() {
        let mut config = AppConfig::default();
        config.reservation.default_ttl_seconds = 7200;
        config.reservation.max_ttl_seconds = 3600;
        assert!(config.validate().is_err());
    }
}
