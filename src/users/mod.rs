//! User directory and durable user store.

pub mod directory;
pub mod models;
pub mod repository;

pub use directory::UserDirectory;
pub use models::{Mute, Payment, Profile, User};
pub use repository::{
    MemoryUserStore, PgUserStore, STARTING_BALANCE, STARTING_INCOME, STARTING_LEVEL, UserRow,
    UserStore,
};
