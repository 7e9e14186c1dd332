//! Redis admission queue using sorted sets and Lua scripts.
//!
//! Each group has a `line` sorted set scored by arrival rank (from an
//! `INCR` counter), a `seen` sorted set scored by last activity, and an
//! entry in the global set of groups. Every mutation is one script, so
//! head checks and removals are atomic across nodes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use boxoffice_cache::keys;
use boxoffice_cache::{RedisClient, redis_error};
use boxoffice_core::error::AppError;
use boxoffice_core::result::AppResult;
use boxoffice_core::traits::Clock;
use boxoffice_core::types::{ClaimantId, EventId};
use boxoffice_entity::queue::{AdmissionOutcome, JoinReceipt, QueuePosition};

use crate::queue::AdmissionQueue;

/// Lua script for an idempotent join.
///
/// KEYS[1] = line, KEYS[2] = sequence, KEYS[3] = seen, KEYS[4] = groups
/// ARGV[1] = claimant, ARGV[2] = now millis, ARGV[3] = group id
///
/// Returns `{rank, rejoined}`.
const JOIN_SCRIPT: &str = r#"
    local existing = redis.call('ZSCORE', KEYS[1], ARGV[1])
    redis.call('ZADD', KEYS[3], ARGV[2], ARGV[1])
    if existing then
        return {tonumber(existing), 1}
    end

    local rank = redis.call('INCR', KEYS[2])
    redis.call('ZADD', KEYS[1], rank, ARGV[1])
    redis.call('SADD', KEYS[4], ARGV[3])
    return {rank, 0}
"#;

/// Lua script for an atomic pop-if-head.
///
/// KEYS[1] = line, KEYS[2] = seen, KEYS[3] = groups
/// ARGV[1] = claimant, ARGV[2] = group id
///
/// Returns 1 when admitted, 0 otherwise.
const ADMIT_SCRIPT: &str = r#"
    local head = redis.call('ZRANGE', KEYS[1], 0, 0)
    if head[1] ~= ARGV[1] then
        return 0
    end
    redis.call('ZREM', KEYS[1], ARGV[1])
    redis.call('ZREM', KEYS[2], ARGV[1])
    if redis.call('ZCARD', KEYS[1]) == 0 then
        redis.call('SREM', KEYS[3], ARGV[2])
    end
    return 1
"#;

/// Lua script for unconditional removal.
///
/// KEYS[1] = line, KEYS[2] = seen, KEYS[3] = groups
/// ARGV[1] = claimant, ARGV[2] = group id
const LEAVE_SCRIPT: &str = r#"
    redis.call('ZREM', KEYS[2], ARGV[1])
    local removed = redis.call('ZREM', KEYS[1], ARGV[1])
    if redis.call('ZCARD', KEYS[1]) == 0 then
        redis.call('SREM', KEYS[3], ARGV[2])
    end
    return removed
"#;

/// Lua script evicting claimants last seen before a cutoff.
///
/// KEYS[1] = line, KEYS[2] = seen, KEYS[3] = groups
/// ARGV[1] = exclusive cutoff millis, ARGV[2] = group id
///
/// Returns the evicted claimants. A drained group leaves the group set.
const EVICT_SCRIPT: &str = r#"
    local stale = redis.call('ZRANGEBYSCORE', KEYS[2], '-inf', '(' .. ARGV[1])
    for _, member in ipairs(stale) do
        redis.call('ZREM', KEYS[1], member)
        redis.call('ZREM', KEYS[2], member)
    end
    if redis.call('ZCARD', KEYS[1]) == 0 then
        redis.call('SREM', KEYS[3], ARGV[2])
    end
    return stale
"#;

/// Redis-backed admission queue for multi-node deployments.
#[derive(Debug, Clone)]
pub struct RedisAdmissionQueue {
    client: RedisClient,
    clock: Arc<dyn Clock>,
    track_activity: bool,
}

impl RedisAdmissionQueue {
    /// Create a queue over an established client.
    pub fn new(client: RedisClient, clock: Arc<dyn Clock>, track_activity: bool) -> Self {
        Self {
            client,
            clock,
            track_activity,
        }
    }

    fn key(&self, key: String) -> String {
        self.client.prefixed_key(&key)
    }
}

#[async_trait]
impl AdmissionQueue for RedisAdmissionQueue {
    async fn join(&self, group: EventId, claimant: &ClaimantId) -> AppResult<JoinReceipt> {
        let mut conn = self.client.conn_mut();
        let (rank, rejoined): (u64, u8) = redis::Script::new(JOIN_SCRIPT)
            .key(self.key(keys::queue_line(group)))
            .key(self.key(keys::queue_sequence(group)))
            .key(self.key(keys::queue_seen(group)))
            .key(self.key(keys::queue_groups()))
            .arg(claimant.as_str())
            .arg(self.clock.now().timestamp_millis())
            .arg(group.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| redis_error("Redis Lua join failed", e))?;

        Ok(JoinReceipt {
            rank,
            rejoined: rejoined == 1,
        })
    }

    async fn position(&self, group: EventId, claimant: &ClaimantId) -> AppResult<QueuePosition> {
        let line_key = self.key(keys::queue_line(group));
        let mut pipe = redis::pipe();
        pipe.cmd("ZRANK").arg(&line_key).arg(claimant.as_str());
        pipe.cmd("ZCARD").arg(&line_key);

        let mut conn = self.client.conn_mut();
        let (rank, total): (Option<u64>, u64) = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_error("Redis queue position failed", e))?;
        let rank = rank.ok_or_else(|| {
            AppError::not_found(format!("{claimant} is not waiting in {group}"))
        })?;

        if self.track_activity {
            // XX: never re-adds a claimant admitted in between.
            let _: () = redis::cmd("ZADD")
                .arg(self.key(keys::queue_seen(group)))
                .arg("XX")
                .arg(self.clock.now().timestamp_millis())
                .arg(claimant.as_str())
                .query_async(&mut conn)
                .await
                .map_err(|e| redis_error("Redis queue touch failed", e))?;
        }

        Ok(QueuePosition::new(rank, total))
    }

    async fn admit_if_head(
        &self,
        group: EventId,
        claimant: &ClaimantId,
    ) -> AppResult<AdmissionOutcome> {
        let mut conn = self.client.conn_mut();
        let admitted: i64 = redis::Script::new(ADMIT_SCRIPT)
            .key(self.key(keys::queue_line(group)))
            .key(self.key(keys::queue_seen(group)))
            .key(self.key(keys::queue_groups()))
            .arg(claimant.as_str())
            .arg(group.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| redis_error("Redis Lua admit failed", e))?;

        Ok(match admitted {
            1 => AdmissionOutcome::Admitted,
            _ => AdmissionOutcome::NotHead,
        })
    }

    async fn leave(&self, group: EventId, claimant: &ClaimantId) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let removed: i64 = redis::Script::new(LEAVE_SCRIPT)
            .key(self.key(keys::queue_line(group)))
            .key(self.key(keys::queue_seen(group)))
            .key(self.key(keys::queue_groups()))
            .arg(claimant.as_str())
            .arg(group.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| redis_error("Redis Lua leave failed", e))?;
        Ok(removed > 0)
    }

    async fn evict_idle(&self, group: EventId, cutoff: DateTime<Utc>) -> AppResult<Vec<ClaimantId>> {
        let mut conn = self.client.conn_mut();
        let stale: Vec<String> = redis::Script::new(EVICT_SCRIPT)
            .key(self.key(keys::queue_line(group)))
            .key(self.key(keys::queue_seen(group)))
            .key(self.key(keys::queue_groups()))
            .arg(cutoff.timestamp_millis())
            .arg(group.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| redis_error("Redis Lua eviction failed", e))?;

        Ok(stale
            .into_iter()
            .filter_map(|raw| match ClaimantId::parse(raw.clone()) {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(claimant = %raw, error = %e, "Skipping malformed queue member");
                    None
                }
            })
            .collect())
    }

    async fn groups(&self) -> AppResult<Vec<EventId>> {
        let mut conn = self.client.conn_mut();
        let raw: Vec<String> = redis::cmd("SMEMBERS")
            .arg(self.key(keys::queue_groups()))
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_error("Redis SMEMBERS failed", e))?;

        Ok(raw.iter().filter_map(|id| id.parse().ok()).collect())
    }

    async fn health_check(&self) -> AppResult<()> {
        self.client.ping().await
    }
}

#[cfg(test)]
mod tests {
    use boxoffice_core::config::RedisConfig;
    use boxoffice_core::traits::SystemClock;

    use super::*;

    #[tokio::test]
    #[ignore = "requires Redis (BOXOFFICE_TEST_REDIS_URL)"]
    async fn test_redis_queue_admits_in_order() {
        let url = std::env::var("BOXOFFICE_TEST_REDIS_URL")
            .expect("BOXOFFICE_TEST_REDIS_URL must be set");
        let config = RedisConfig {
            url,
            key_prefix: format!("boxoffice-test:{}:", EventId::new()),
        };
        let client = RedisClient::connect(&config).await.unwrap();
        let queue = RedisAdmissionQueue::new(client, Arc::new(SystemClock), false);

        let group = EventId::new();
        let a = ClaimantId::parse("a").unwrap();
        let b = ClaimantId::parse("b").unwrap();
        let c = ClaimantId::parse("c").unwrap();
        for who in [&a, &b, &c] {
            queue.join(group, who).await.unwrap();
        }
        let again = queue.join(group, &a).await.unwrap();
        assert!(again.rejoined);

        assert_eq!(
            queue.admit_if_head(group, &c).await.unwrap(),
            AdmissionOutcome::NotHead
        );
        assert_eq!(
            queue.admit_if_head(group, &a).await.unwrap(),
            AdmissionOutcome::Admitted
        );
        assert_eq!(queue.position(group, &c).await.unwrap(), QueuePosition::new(1, 2));
        assert_eq!(
            queue.admit_if_head(group, &b).await.unwrap(),
            AdmissionOutcome::Admitted
        );
        assert!(queue.groups().await.unwrap().contains(&group));
        assert!(queue.leave(group, &c).await.unwrap());
        assert!(!queue.groups().await.unwrap().contains(&group));
    }
}
