//! Hamsterbank - Virtual-Economy Engine
//!
//! Per-user balances, paid mutes, a rigged slot machine and a steal
//! mechanic for a chat game, over a two-tier store: a Redis hot path
//! that serves every read, and a PostgreSQL durable store that
//! backfills cache misses.
//!
//! # Modules
//!
//! - [`cache`] - Hot-path key/value store (Redis + in-memory fake)
//! - [`users`] - User directory, durable store, cache backfill
//! - [`payments`] - Balance transfers between users
//! - [`mutes`] - Paid mute escrow with duration pricing
//! - [`plays`] - Slot machine and steal mechanics
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing setup with file rotation
//! - [`db`] - PostgreSQL pool wrapper
//! - [`error`] - Engine-wide error type

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod mutes;
pub mod payments;
pub mod plays;
pub mod users;

// Convenient re-exports at crate root
pub use cache::{CacheStore, MemoryCache, RedisCache};
pub use config::AppConfig;
pub use db::Database;
pub use error::EconomyError;
pub use mutes::{MuteKind, MuteService, parse_duration, price};
pub use payments::PaymentService;
pub use plays::{HOUSE_ACCOUNT_ID, PlayService, SlotsResult, Symbol};
pub use users::{Mute, Profile, User, UserDirectory, UserStore};
