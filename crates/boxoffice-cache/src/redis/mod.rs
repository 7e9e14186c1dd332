//! Redis client.

pub mod client;

pub use client::{RedisClient, redis_error};
