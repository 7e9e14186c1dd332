//! Redis connection management.

use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;

use boxoffice_core::config::RedisConfig;
use boxoffice_core::error::{AppError, ErrorKind};
use boxoffice_core::result::AppResult;

/// Redis client wrapper with connection management.
#[derive(Clone)]
pub struct RedisClient {
    /// Redis connection manager (pooled, reconnecting).
    conn: ConnectionManager,
    /// Key prefix for all keys.
    key_prefix: String,
}

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient")
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

impl RedisClient {
    /// Create a new Redis client from configuration.
    pub async fn connect(config: &RedisConfig) -> AppResult<Self> {
        info!(url = %mask_redis_url(&config.url), "Connecting to Redis");

        let client = Client::open(config.url.as_str())
            .map_err(|e| redis_error("Failed to create Redis client", e))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| redis_error("Failed to connect to Redis", e))?;

        info!("Successfully connected to Redis");
        Ok(Self {
            conn,
            key_prefix: config.key_prefix.clone(),
        })
    }

    /// Get a mutable clone of the connection manager.
    pub fn conn_mut(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Build a full key with the configured prefix.
    pub fn prefixed_key(&self, key: &str) -> String {
        format!("{}{key}", self.key_prefix)
    }

    /// Return the key prefix.
    pub fn prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Round-trip a PING.
    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.conn_mut();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_error("Redis PING failed", e))?;
        Ok(())
    }
}

/// Map a Redis failure to the retryable store error.
pub fn redis_error(context: &str, err: redis::RedisError) -> AppError {
    AppError::with_source(ErrorKind::StoreUnavailable, format!("{context}: {err}"), err)
}

/// Replace the password of a Redis URL with `****` for logging.
///
/// Handles both `user:pass@` and password-only `:pass@` credentials.
fn mask_redis_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((userinfo, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:****@{host}"),
        None => url.to_string(),
    }
}
