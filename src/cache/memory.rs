//! In-memory cache store.
//!
//! Drop-in substitute for [`RedisCache`](super::RedisCache) in tests
//! and local runs without a Redis instance. Honors TTLs by stamping an
//! expiry on each entry and evicting lazily on access.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

use super::CacheStore;
use crate::error::EconomyError;

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining TTL of a live, bounded key. Test hook.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let entries = self.entries.lock().await;
        let entry = entries.get(key)?;
        if entry.expired() {
            return None;
        }
        (entry.expires_at? - Utc::now()).to_std().ok()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, EconomyError> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expired() => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), EconomyError> {
        let expires_at = match ttl {
            Some(ttl) => {
                let delta = TimeDelta::from_std(ttl).map_err(|_| EconomyError::Unknown)?;
                Some(Utc::now() + delta)
            }
            None => None,
        };
        self.entries.lock().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), EconomyError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, EconomyError> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expired() => {
                entries.remove(key);
                Ok(false)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, EconomyError> {
        // Only the single-star `prefix*suffix` form is supported, which
        // covers every pattern the engine uses.
        let (prefix, suffix) = pattern.split_once('*').unwrap_or((pattern, ""));
        let entries = self.entries.lock().await;
        Ok(entries
            .iter()
            .filter(|(key, entry)| {
                !entry.expired()
                    && key.len() >= prefix.len() + suffix.len()
                    && key.starts_with(prefix)
                    && key.ends_with(suffix)
            })
            .map(|(key, _)| key.clone())
            .collect())
    }
}
