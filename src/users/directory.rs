//! User directory: resolves handles and ids to canonical records.
//!
//! Reads run cache-first. On a logical miss the durable store is
//! consulted and the cache backfilled; on a cache *error* the operation
//! aborts instead (see [`crate::cache`]). Balance writes go through
//! both tiers in the same call so a present cached balance always
//! reflects the last committed value.

use std::sync::Arc;
use tracing::debug;

use super::models::{Mute, Profile, User};
use super::repository::{UserRow, UserStore};
use crate::cache::{CacheStore, keys};
use crate::error::EconomyError;

/// Cached per-user fields, in read order. A miss on any of them except
/// `mute` invalidates the whole cached record.
const CACHED_FIELDS: [&str; 5] = [
    keys::FIELD_USERNAME,
    keys::FIELD_BALANCE,
    keys::FIELD_LEVEL,
    keys::FIELD_INCOME,
    keys::FIELD_MUTE,
];

pub struct UserDirectory {
    cache: Arc<dyn CacheStore>,
    store: Arc<dyn UserStore>,
}

impl UserDirectory {
    pub fn new(cache: Arc<dyn CacheStore>, store: Arc<dyn UserStore>) -> Self {
        Self { cache, store }
    }

    /// Resolve a user handle (with or without the leading `@`).
    ///
    /// The reverse index is tried first; a hit delegates to
    /// [`resolve_by_id`](Self::resolve_by_id), a miss falls back to the
    /// durable store and backfills the cache.
    pub async fn resolve_by_username(&self, username: &str) -> Result<User, EconomyError> {
        let username = username.trim_start_matches('@');

        match self.cache.get(&keys::username_index(username)).await? {
            Some(id) => {
                let id: i64 = id.parse()?;
                self.resolve_by_id(id).await
            }
            None => {
                let row = self
                    .store
                    .get_by_username(username)
                    .await?
                    .ok_or(EconomyError::UserNotFound)?;
                self.backfill(&row).await?;
                Ok(user_from_row(row))
            }
        }
    }

    /// Resolve a user by id, field by field from the cache.
    pub async fn resolve_by_id(&self, id: i64) -> Result<User, EconomyError> {
        if let Some(user) = self.read_cached(id).await? {
            return Ok(user);
        }

        debug!(id, "cached record incomplete, falling back to the durable store");
        let row = self
            .store
            .get_by_id(id)
            .await?
            .ok_or(EconomyError::UserNotFound)?;
        self.backfill(&row).await?;
        Ok(user_from_row(row))
    }

    /// Write a balance through both tiers: durable UPDATE first, then
    /// the cache (no TTL). Returns the balance as written.
    pub async fn set_balance(&self, id: i64, balance: i64) -> Result<i64, EconomyError> {
        self.store.set_balance(id, balance).await?;
        self.cache
            .set(
                &keys::user_field(id, keys::FIELD_BALANCE),
                &balance.to_string(),
                None,
            )
            .await?;
        Ok(balance)
    }

    /// Register a new user with the starting package. The cache stays
    /// untouched; the first resolve backfills it.
    pub async fn register(&self, id: i64, username: &str) -> Result<(), EconomyError> {
        self.store.insert(id, username.trim_start_matches('@')).await
    }

    /// Keep the identity row in step with what the transport sees:
    /// insert when absent, rewrite when anything changed.
    pub async fn sync_profile(&self, profile: &Profile) -> Result<(), EconomyError> {
        match self.store.get_profile(profile.id).await? {
            None => self.store.insert_profile(profile).await,
            Some(current) if current != *profile => self.store.update_profile(profile).await,
            Some(_) => Ok(()),
        }
    }

    /// Remove a user from the durable store.
    pub async fn remove(&self, id: i64) -> Result<(), EconomyError> {
        self.store.delete(id).await
    }

    /// Credit every cached user's hourly income onto their balance.
    /// Driven by the scheduler once an hour; users without a cached
    /// balance simply miss a tick until their next resolve.
    pub async fn apply_hourly_income(&self) -> Result<(), EconomyError> {
        for key in self.cache.keys(keys::BALANCE_PATTERN).await? {
            let Some(id) = keys::user_id_from_balance_key(&key) else {
                continue;
            };
            let Some(balance) = self.cache.get(&key).await? else {
                continue;
            };
            let Some(income) = self
                .cache
                .get(&keys::user_field(id, keys::FIELD_INCOME))
                .await?
            else {
                continue;
            };

            let balance: i64 = balance.parse()?;
            let income: i64 = income.parse()?;
            self.set_balance(id, balance + income).await?;
        }
        Ok(())
    }

    /// Read the full field set from the cache. `Ok(None)` when any
    /// field other than `mute` is absent.
    async fn read_cached(&self, id: i64) -> Result<Option<User>, EconomyError> {
        let mut user = User {
            id,
            username: String::new(),
            balance: 0,
            level: 0,
            hourly_income: 0,
            mute: Mute::default(),
        };

        for field in CACHED_FIELDS {
            let value = self.cache.get(&keys::user_field(id, field)).await?;
            let Some(raw) = value else {
                if field == keys::FIELD_MUTE {
                    // an expired mute key just means "not muted"
                    continue;
                }
                return Ok(None);
            };
            match field {
                keys::FIELD_USERNAME => user.username = raw,
                keys::FIELD_BALANCE => user.balance = raw.parse()?,
                keys::FIELD_LEVEL => user.level = raw.parse()?,
                keys::FIELD_INCOME => user.hourly_income = raw.parse()?,
                keys::FIELD_MUTE => user.mute = serde_json::from_str(&raw)?,
                _ => {}
            }
        }

        Ok(Some(user))
    }

    /// Write a freshly loaded row into the cache, every field with no
    /// TTL. The durable store knows nothing about mutes, so the mute
    /// slot is rewritten as empty alongside the rest of the record.
    async fn backfill(&self, row: &UserRow) -> Result<(), EconomyError> {
        self.cache
            .set(&keys::username_index(&row.username), &row.id.to_string(), None)
            .await?;
        self.cache
            .set(
                &keys::user_field(row.id, keys::FIELD_USERNAME),
                &row.username,
                None,
            )
            .await?;
        self.cache
            .set(
                &keys::user_field(row.id, keys::FIELD_BALANCE),
                &row.balance.to_string(),
                None,
            )
            .await?;
        self.cache
            .set(
                &keys::user_field(row.id, keys::FIELD_LEVEL),
                &row.level.to_string(),
                None,
            )
            .await?;
        self.cache
            .set(
                &keys::user_field(row.id, keys::FIELD_INCOME),
                &row.hourly_income.to_string(),
                None,
            )
            .await?;
        let empty_mute = serde_json::to_string(&Mute::default())?;
        self.cache.set(&keys::mute(row.id), &empty_mute, None).await?;
        Ok(())
    }
}

fn user_from_row(row: UserRow) -> User {
    User {
        id: row.id,
        username: row.username,
        balance: row.balance,
        level: row.level,
        hourly_income: row.hourly_income,
        mute: Mute::default(),
    }
}
