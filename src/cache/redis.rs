//! Redis-backed cache store.
//!
//! The connection manager is established lazily on first use and shared
//! behind a mutex; `ConnectionManager` itself reconnects on failure.

use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use tokio::sync::Mutex;

use super::CacheStore;
use crate::error::EconomyError;

/// Millisecond TTL for PSETEX. Cache expiry doubles as mute expiry, so
/// sub-second remainders must survive the conversion.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

pub struct RedisCache {
    client: redis::Client,
    connection: Mutex<Option<redis::aio::ConnectionManager>>,
    prefix: String,
}

impl RedisCache {
    pub fn new(url: &str, prefix: String) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
            prefix,
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    async fn connection(&self) -> Result<redis::aio::ConnectionManager, EconomyError> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self.client.get_connection_manager().await?;
        *guard = Some(conn.clone());
        Ok(conn)
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, EconomyError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(self.key(key)).await?;
        Ok(value)
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), EconomyError> {
        let mut conn = self.connection().await?;
        let key = self.key(key);
        match ttl {
            Some(ttl) => {
                let _: () = conn.pset_ex(key, value, ttl_millis(ttl)).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), EconomyError> {
        let mut conn = self.connection().await?;
        let _: () = conn.del(self.key(key)).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, EconomyError> {
        let mut conn = self.connection().await?;
        let exists: bool = conn.exists(self.key(key)).await?;
        Ok(exists)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, EconomyError> {
        let mut conn = self.connection().await?;
        let keys: Vec<String> = conn.keys(self.key(pattern)).await?;
        // Callers see logical names, so the deployment prefix comes back off.
        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(&self.prefix).map(str::to_string))
            .collect())
    }
}
