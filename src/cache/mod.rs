//! Cache-aside key-value layer.
//!
//! The cache is the hot path for per-user fields; the relational store
//! is the cold path, consulted only on a logical miss. A missing key is
//! a normal outcome (`Ok(None)`) and must never be confused with a
//! failed round trip, which aborts the calling operation. There is no
//! retry policy and no automatic durable-store fallback on an *error*.

#[cfg(test)]
pub(crate) mod faulty;
pub mod keys;
pub mod memory;
pub mod redis;

pub use memory::MemoryCache;
pub use self::redis::RedisCache;

use crate::error::EconomyError;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a key. `Ok(None)` is a miss, not an error.
    async fn get(&self, key: &str) -> Result<Option<String>, EconomyError>;

    /// Write a key. `ttl: None` keeps the value until it is
    /// explicitly overwritten or deleted.
    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), EconomyError>;

    /// Remove a key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), EconomyError>;

    async fn exists(&self, key: &str) -> Result<bool, EconomyError>;

    /// List keys matching a glob pattern (e.g. `user:*:balance`).
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, EconomyError>;
}
