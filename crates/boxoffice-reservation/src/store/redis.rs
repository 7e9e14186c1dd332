//! Redis reservation store using versioned compare-and-set scripts.
//!
//! Each resource lives in a hash holding a `version` counter and a JSON
//! `doc` with the resource and its active hold. An update reads the hash,
//! applies the mutation locally, and writes back through a Lua script that
//! only succeeds if the version is unchanged; on conflict the update is
//! retried from a fresh read. Suitable for multi-node deployments.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use boxoffice_cache::keys;
use boxoffice_cache::{RedisClient, redis_error};
use boxoffice_core::error::AppError;
use boxoffice_core::result::AppResult;
use boxoffice_core::types::{EventId, HoldId, ResourceId};
use boxoffice_entity::hold::Hold;
use boxoffice_entity::resource::Resource;

use super::{ReservationStore, Slot};

/// Lua script for an atomic versioned slot write.
///
/// KEYS[1] = slot hash
/// KEYS[2] = hold expiry index
/// KEYS[3..] = hold documents written by this update
/// ARGV[1] = expected version
/// ARGV[2] = new slot document
/// ARGV[3..] = per written hold: document, id, expiry millis ("" when closed)
///
/// Returns:
///   1 = written
///   0 = version conflict, nothing written
///  -1 = slot does not exist
const COMPARE_AND_SET_SCRIPT: &str = r#"
    local version = redis.call('HGET', KEYS[1], 'version')
    if not version then
        return -1
    end
    if version ~= ARGV[1] then
        return 0
    end

    redis.call('HSET', KEYS[1], 'version', tostring(tonumber(version) + 1), 'doc', ARGV[2])

    for i = 3, #KEYS do
        local base = 3 + (i - 3) * 3
        redis.call('SET', KEYS[i], ARGV[base])
        local expiry = ARGV[base + 2]
        if expiry == '' then
            redis.call('ZREM', KEYS[2], ARGV[base + 1])
        else
            redis.call('ZADD', KEYS[2], expiry, ARGV[base + 1])
        end
    end
    return 1
"#;

/// JSON document stored in the slot hash.
#[derive(Debug, Serialize, Deserialize)]
struct SlotDocument {
    resource: Resource,
    active: Option<Hold>,
}

/// Redis-backed reservation store.
#[derive(Debug, Clone)]
pub struct RedisReservationStore {
    client: RedisClient,
    max_retries: u32,
}

impl RedisReservationStore {
    /// Create a store that retries conflicting writes up to `max_retries`
    /// times before reporting `StoreUnavailable`.
    pub fn new(client: RedisClient, max_retries: u32) -> Self {
        Self {
            client,
            max_retries,
        }
    }

    fn slot_key(&self, id: ResourceId) -> String {
        self.client.prefixed_key(&keys::resource_slot(id))
    }

    fn hold_key(&self, id: HoldId) -> String {
        self.client.prefixed_key(&keys::hold(id))
    }

    async fn load_slot(
        &self,
        conn: &mut ConnectionManager,
        key: &str,
    ) -> AppResult<Option<(u64, SlotDocument)>> {
        let (version, doc): (Option<u64>, Option<String>) = redis::cmd("HMGET")
            .arg(key)
            .arg("version")
            .arg("doc")
            .query_async(conn)
            .await
            .map_err(|e| redis_error("Redis HMGET failed", e))?;

        match (version, doc) {
            (Some(version), Some(doc)) => Ok(Some((version, serde_json::from_str(&doc)?))),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl ReservationStore for RedisReservationStore {
    async fn register_resources(&self, resources: &[Resource]) -> AppResult<()> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for resource in resources {
            let doc = serde_json::to_string(&SlotDocument {
                resource: resource.clone(),
                active: None,
            })?;
            pipe.cmd("HSET")
                .arg(self.slot_key(resource.id))
                .arg("version")
                .arg(0u64)
                .arg("doc")
                .arg(doc)
                .ignore();
            pipe.cmd("RPUSH")
                .arg(self.client.prefixed_key(&keys::event_resources(resource.event_id)))
                .arg(resource.id.to_string())
                .ignore();
        }

        let mut conn = self.client.conn_mut();
        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_error("Failed to register resources", e))?;
        Ok(())
    }

    async fn get_resource(&self, id: ResourceId) -> AppResult<Option<Resource>> {
        let mut conn = self.client.conn_mut();
        let slot = self.load_slot(&mut conn, &self.slot_key(id)).await?;
        Ok(slot.map(|(_, doc)| doc.resource))
    }

    async fn list_resources(&self, event_id: EventId) -> AppResult<Vec<Resource>> {
        let mut conn = self.client.conn_mut();
        let ids: Vec<String> = redis::cmd("LRANGE")
            .arg(self.client.prefixed_key(&keys::event_resources(event_id)))
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_error("Redis LRANGE failed", e))?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for id in &ids {
            pipe.cmd("HGET")
                .arg(self.client.prefixed_key(&keys::resource_slot(id)))
                .arg("doc");
        }
        let docs: Vec<Option<String>> = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_error("Failed to load resources", e))?;

        docs.into_iter()
            .flatten()
            .map(|doc| {
                serde_json::from_str::<SlotDocument>(&doc)
                    .map(|slot| slot.resource)
                    .map_err(AppError::from)
            })
            .collect()
    }

    async fn get_hold(&self, id: HoldId) -> AppResult<Option<Hold>> {
        let mut conn = self.client.conn_mut();
        let doc: Option<String> = redis::cmd("GET")
            .arg(self.hold_key(id))
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_error("Redis GET failed", e))?;
        doc.map(|doc| serde_json::from_str(&doc).map_err(AppError::from))
            .transpose()
    }

    async fn update_slot(
        &self,
        resource_id: ResourceId,
        apply: &mut (dyn for<'s> FnMut(&'s mut Slot) + Send),
    ) -> AppResult<Slot> {
        let slot_key = self.slot_key(resource_id);
        let expiry_key = self.client.prefixed_key(&keys::hold_expiry_index());
        let script = redis::Script::new(COMPARE_AND_SET_SCRIPT);
        let mut conn = self.client.conn_mut();

        for attempt in 0..=self.max_retries {
            let (version, doc) = self
                .load_slot(&mut conn, &slot_key)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Resource {resource_id} not found")))?;

            let mut slot = Slot::new(doc.resource, doc.active);
            apply(&mut slot);
            if !slot.is_dirty() {
                return Ok(slot);
            }

            let next = serde_json::to_string(&SlotDocument {
                resource: slot.resource().clone(),
                active: slot.active_hold().cloned(),
            })?;

            let mut invocation = script.prepare_invoke();
            invocation.key(&slot_key).key(&expiry_key);
            for hold in slot.written_holds() {
                invocation.key(self.hold_key(hold.id));
            }
            invocation.arg(version).arg(next);
            for hold in slot.written_holds() {
                let expiry = if hold.is_active() {
                    hold.expires_at.timestamp_millis().to_string()
                } else {
                    String::new()
                };
                invocation
                    .arg(serde_json::to_string(hold)?)
                    .arg(hold.id.to_string())
                    .arg(expiry);
            }

            let result: i64 = invocation
                .invoke_async(&mut conn)
                .await
                .map_err(|e| redis_error("Redis Lua compare-and-set failed", e))?;

            match result {
                1 => return Ok(slot),
                0 => {
                    debug!(resource_id = %resource_id, attempt, "Slot version conflict, retrying");
                }
                -1 => {
                    return Err(AppError::not_found(format!(
                        "Resource {resource_id} not found"
                    )));
                }
                other => {
                    return Err(AppError::internal(format!(
                        "Unexpected compare-and-set result: {other}"
                    )));
                }
            }
        }

        warn!(
            resource_id = %resource_id,
            retries = self.max_retries,
            "Slot update gave up after repeated conflicts"
        );
        Err(AppError::store_unavailable(format!(
            "Resource {resource_id} is under heavy contention, try again"
        )))
    }

    async fn find_expired_holds(
        &self,
        now: DateTime<Utc>,
        exclude: &[HoldId],
        limit: usize,
    ) -> AppResult<Vec<Hold>> {
        // Over-fetch so excluded ids at the front cannot crowd out the page.
        let mut conn = self.client.conn_mut();
        let ids: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(self.client.prefixed_key(&keys::hold_expiry_index()))
            .arg("-inf")
            .arg(now.timestamp_millis())
            .arg("LIMIT")
            .arg(0)
            .arg(limit.saturating_add(exclude.len()))
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_error("Redis ZRANGEBYSCORE failed", e))?;

        let skip: HashSet<String> = exclude.iter().map(ToString::to_string).collect();
        let ids: Vec<String> = ids
            .into_iter()
            .filter(|id| !skip.contains(id))
            .take(limit)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for id in &ids {
            pipe.cmd("GET").arg(self.client.prefixed_key(&keys::hold(id)));
        }
        let docs: Vec<Option<String>> = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_error("Failed to load expired holds", e))?;

        let mut holds = Vec::with_capacity(docs.len());
        for doc in docs.into_iter().flatten() {
            let hold: Hold = serde_json::from_str(&doc)?;
            if hold.is_active() && hold.is_expired_at(now) {
                holds.push(hold);
            }
        }
        Ok(holds)
    }

    async fn health_check(&self) -> AppResult<()> {
        self.client.ping().await
    }
}
