//! Fault-injecting cache wrapper for failure-path tests.
//!
//! Delegates to a [`MemoryCache`] but fails a chosen operation on a
//! chosen key. Faults are armed after test setup, so warm-up traffic
//! (backfills, seeding) passes through untouched.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{CacheStore, MemoryCache};
use crate::error::EconomyError;

pub(crate) struct FaultyCache {
    inner: MemoryCache,
    set_fault: Mutex<Option<String>>,
    exists_fault: Mutex<Option<String>>,
}

impl FaultyCache {
    pub(crate) fn new() -> Self {
        Self {
            inner: MemoryCache::new(),
            set_fault: Mutex::new(None),
            exists_fault: Mutex::new(None),
        }
    }

    /// Fail every subsequent `set` on `key`.
    pub(crate) async fn arm_set_fault(&self, key: &str) {
        *self.set_fault.lock().await = Some(key.to_string());
    }

    /// Fail every subsequent `exists` on `key`.
    pub(crate) async fn arm_exists_fault(&self, key: &str) {
        *self.exists_fault.lock().await = Some(key.to_string());
    }

    fn injected() -> EconomyError {
        EconomyError::Cache(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "injected fault",
        )))
    }
}

#[async_trait]
impl CacheStore for FaultyCache {
    async fn get(&self, key: &str) -> Result<Option<String>, EconomyError> {
        self.inner.get(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), EconomyError> {
        if self.set_fault.lock().await.as_deref() == Some(key) {
            return Err(Self::injected());
        }
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), EconomyError> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, EconomyError> {
        if self.exists_fault.lock().await.as_deref() == Some(key) {
            return Err(Self::injected());
        }
        self.inner.exists(key).await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, EconomyError> {
        self.inner.keys(pattern).await
    }
}
