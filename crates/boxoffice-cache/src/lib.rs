//! # boxoffice-cache
//!
//! Shared Redis plumbing for the Redis-backed reservation store and
//! admission queue: a reconnecting client with a key prefix, and the
//! central key layout.

pub mod keys;
pub mod redis;

pub use self::redis::{RedisClient, redis_error};
