//! Record types shared across the engine.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Economy record of a chat user.
///
/// `id` is immutable once assigned; `username` is a secondary, mutable
/// lookup key. The balance is intended to stay non-negative but the
/// engine does not hard-enforce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub balance: i64,
    pub level: i64,
    pub hourly_income: i64,
    pub mute: Mute,
}

/// Identity record kept in the same `users` table, maintained by the
/// transport on every interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: i64,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub is_premium: bool,
}

/// Ephemeral transfer record handed back to the transport. Not
/// persisted as history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub to: i64,
    pub from: i64,
    pub amount: i64,
}

/// A mute window. The zero value means "not muted".
///
/// `duration_ns` is the remaining mute time as of `start`; every
/// adjustment must subtract elapsed time exactly once before resetting
/// `start`, so the same elapsed span is never charged twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Mute {
    pub start: Option<DateTime<Utc>>,
    pub duration_ns: i64,
}

impl Mute {
    /// Open a window of `duration` starting at `start`.
    pub fn window(start: DateTime<Utc>, duration: TimeDelta) -> Self {
        Self {
            start: Some(start),
            duration_ns: saturating_nanos(duration),
        }
    }

    pub fn active(&self) -> bool {
        *self != Mute::default()
    }

    pub fn duration(&self) -> TimeDelta {
        TimeDelta::nanoseconds(self.duration_ns)
    }

    /// Remaining mute time as of `now`. Negative once the window has
    /// lapsed without the record being cleaned up.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> TimeDelta {
        match self.start {
            Some(start) => self.duration() - (now - start),
            None => TimeDelta::zero(),
        }
    }
}

/// Clamp a delta into an i64 nanosecond count. Spans anywhere near the
/// clamp are far beyond any purchasable mute.
pub(crate) fn saturating_nanos(delta: TimeDelta) -> i64 {
    delta.num_nanoseconds().unwrap_or(i64::MAX)
}
