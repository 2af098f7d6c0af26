//! Durable user store: repository trait, PostgreSQL implementation and
//! an in-memory fake for tests.
//!
//! The `users` table carries two logically distinct shapes: the economy
//! profile (`username, balance, lvl, income`) and the identity profile
//! (`username, firstname, lastname, ispremium`). The trait exposes them
//! as separate operations over the same rows.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::models::Profile;
use crate::error::EconomyError;

/// Starting package granted to a freshly registered user.
pub const STARTING_BALANCE: i64 = 1500;
pub const STARTING_LEVEL: i64 = 1;
pub const STARTING_INCOME: i64 = 250;

/// Economy shape of a `users` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub balance: i64,
    pub level: i64,
    pub hourly_income: i64,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Economy row by id. `Ok(None)` when no such user exists.
    async fn get_by_id(&self, id: i64) -> Result<Option<UserRow>, EconomyError>;

    /// Economy row by username (stored without the `@` marker).
    async fn get_by_username(&self, username: &str) -> Result<Option<UserRow>, EconomyError>;

    /// Overwrite a user's balance. Writing to an absent id is a no-op.
    async fn set_balance(&self, id: i64, balance: i64) -> Result<(), EconomyError>;

    /// Insert a fresh economy row with the starting package.
    async fn insert(&self, id: i64, username: &str) -> Result<(), EconomyError>;

    /// Identity row by id.
    async fn get_profile(&self, id: i64) -> Result<Option<Profile>, EconomyError>;

    async fn insert_profile(&self, profile: &Profile) -> Result<(), EconomyError>;

    async fn update_profile(&self, profile: &Profile) -> Result<(), EconomyError>;

    /// Remove a user entirely.
    async fn delete(&self, id: i64) -> Result<(), EconomyError>;
}

// ============================================================================
// PostgreSQL implementation
// ============================================================================

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: sqlx::postgres::PgRow) -> UserRow {
    UserRow {
        id: row.get("id"),
        username: row.get("username"),
        balance: row.get("balance"),
        level: row.get("lvl"),
        hourly_income: row.get("income"),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get_by_id(&self, id: i64) -> Result<Option<UserRow>, EconomyError> {
        let row = sqlx::query(
            r#"SELECT id, username, balance, lvl, income FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_user))
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<UserRow>, EconomyError> {
        let row = sqlx::query(
            r#"SELECT id, username, balance, lvl, income FROM users WHERE username = $1"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_user))
    }

    async fn set_balance(&self, id: i64, balance: i64) -> Result<(), EconomyError> {
        sqlx::query(r#"UPDATE users SET balance = $1 WHERE id = $2"#)
            .bind(balance)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert(&self, id: i64, username: &str) -> Result<(), EconomyError> {
        sqlx::query(
            r#"INSERT INTO users (id, username, balance, lvl, income) VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(id)
        .bind(username)
        .bind(STARTING_BALANCE)
        .bind(STARTING_LEVEL)
        .bind(STARTING_INCOME)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_profile(&self, id: i64) -> Result<Option<Profile>, EconomyError> {
        let row = sqlx::query(
            r#"SELECT id, username, firstname, lastname, ispremium FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Profile {
            id: r.get("id"),
            username: r.get("username"),
            firstname: r.get("firstname"),
            lastname: r.get("lastname"),
            is_premium: r.get("ispremium"),
        }))
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<(), EconomyError> {
        sqlx::query(
            r#"INSERT INTO users (id, username, firstname, lastname, ispremium)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(profile.id)
        .bind(&profile.username)
        .bind(&profile.firstname)
        .bind(&profile.lastname)
        .bind(profile.is_premium)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_profile(&self, profile: &Profile) -> Result<(), EconomyError> {
        sqlx::query(
            r#"UPDATE users SET username = $2, firstname = $3, lastname = $4, ispremium = $5
               WHERE id = $1"#,
        )
        .bind(profile.id)
        .bind(&profile.username)
        .bind(&profile.firstname)
        .bind(&profile.lastname)
        .bind(profile.is_premium)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), EconomyError> {
        sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ============================================================================
// In-memory implementation (tests, local runs)
// ============================================================================

/// HashMap-backed store mirroring the relational contract.
#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<HashMap<i64, UserRow>>,
    profiles: Mutex<HashMap<i64, Profile>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload an economy row, bypassing registration defaults.
    pub async fn seed(&self, row: UserRow) {
        self.rows.lock().await.insert(row.id, row);
    }

    /// Direct read of the durable balance. Test hook.
    pub async fn balance(&self, id: i64) -> Option<i64> {
        self.rows.lock().await.get(&id).map(|r| r.balance)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_by_id(&self, id: i64) -> Result<Option<UserRow>, EconomyError> {
        Ok(self.rows.lock().await.get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<UserRow>, EconomyError> {
        Ok(self
            .rows
            .lock()
            .await
            .values()
            .find(|r| r.username == username)
            .cloned())
    }

    async fn set_balance(&self, id: i64, balance: i64) -> Result<(), EconomyError> {
        if let Some(row) = self.rows.lock().await.get_mut(&id) {
            row.balance = balance;
        }
        Ok(())
    }

    async fn insert(&self, id: i64, username: &str) -> Result<(), EconomyError> {
        self.rows.lock().await.insert(
            id,
            UserRow {
                id,
                username: username.to_string(),
                balance: STARTING_BALANCE,
                level: STARTING_LEVEL,
                hourly_income: STARTING_INCOME,
            },
        );
        Ok(())
    }

    async fn get_profile(&self, id: i64) -> Result<Option<Profile>, EconomyError> {
        Ok(self.profiles.lock().await.get(&id).cloned())
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<(), EconomyError> {
        self.profiles.lock().await.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn update_profile(&self, profile: &Profile) -> Result<(), EconomyError> {
        self.profiles.lock().await.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), EconomyError> {
        self.rows.lock().await.remove(&id);
        self.profiles.lock().await.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_applies_starting_package() {
        let store = MemoryUserStore::new();
        store.insert(42, "hamster").await.unwrap();

        let row = store.get_by_id(42).await.unwrap().unwrap();
        assert_eq!(row.balance, STARTING_BALANCE);
        assert_eq!(row.level, STARTING_LEVEL);
        assert_eq!(row.hourly_income, STARTING_INCOME);
    }

    #[tokio::test]
    async fn lookup_by_username() {
        let store = MemoryUserStore::new();
        store.insert(42, "hamster").await.unwrap();

        let row = store.get_by_username("hamster").await.unwrap().unwrap();
        assert_eq!(row.id, 42);
        assert!(store.get_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_balance_on_absent_id_is_noop() {
        let store = MemoryUserStore::new();
        store.set_balance(999, 100).await.unwrap();
        assert!(store.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_both_shapes() {
        let store = MemoryUserStore::new();
        store.insert(42, "hamster").await.unwrap();
        store
            .insert_profile(&Profile {
                id: 42,
                username: "hamster".to_string(),
                firstname: "Ham".to_string(),
                lastname: "Ster".to_string(),
                is_premium: false,
            })
            .await
            .unwrap();

        store.delete(42).await.unwrap();
        assert!(store.get_by_id(42).await.unwrap().is_none());
        assert!(store.get_profile(42).await.unwrap().is_none());
    }
}
