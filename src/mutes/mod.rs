//! Mute escrow: paid, time-bounded restrictions priced by duration.
//!
//! A mute is bought against a target user for a compact duration spec
//! (`30s`, `5m`, `2h`). While a window is active, buying another one
//! extends it: the time already served is subtracted once, the new
//! duration added, and the clock restarted. The record lives in the
//! cache with a TTL equal to the remaining duration, so cache expiry
//! doubles as mute expiry. An early unmute releases the whole window.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tracing::{error, info};

use crate::cache::{CacheStore, keys};
use crate::error::EconomyError;
use crate::users::models::saturating_nanos;
use crate::users::{Mute, UserDirectory};

/// Price table selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteKind {
    Mute,
    Unmute,
}

/// Parse a compact duration spec: digits followed by `s`, `m` or `h`.
pub fn parse_duration(spec: &str) -> Result<TimeDelta, EconomyError> {
    let invalid = || EconomyError::InvalidDuration(spec.to_string());

    let mut chars = spec.chars();
    let unit = chars.next_back().ok_or_else(invalid)?;
    let digits = chars.as_str();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let value: i64 = digits.parse().map_err(|_| invalid())?;

    match unit {
        's' => TimeDelta::try_seconds(value),
        'm' => TimeDelta::try_minutes(value),
        'h' => TimeDelta::try_hours(value),
        _ => None,
    }
    .ok_or_else(invalid)
}

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MINUTE;

/// Cost of a mute or unmute of the given duration.
///
/// Whole seconds times a per-second rate, where the rate is picked by
/// the coarsest unit that divides the duration exactly, checked hour
/// then minute then second; durations that divide by none of them (a
/// remainder of a partially served window, say) fall back to the hour
/// rate. A duration that is a whole number of hours is therefore
/// always priced at the hour rate even though it is also a whole
/// number of minutes.
pub fn price(kind: MuteKind, duration: TimeDelta) -> i64 {
    let (per_second, per_minute, per_hour) = match kind {
        MuteKind::Mute => (7, 5, 3),
        MuteKind::Unmute => (5, 3, 2),
    };

    let nanos = saturating_nanos(duration);
    let rate = if nanos % NANOS_PER_HOUR == 0 {
        per_hour
    } else if nanos % NANOS_PER_MINUTE == 0 {
        per_minute
    } else if nanos % NANOS_PER_SECOND == 0 {
        per_second
    } else {
        per_hour
    };

    duration.num_seconds() * rate
}

/// Merge a new mute request into whatever window is on record.
///
/// For an active window the elapsed time since its start is charged
/// against the stored remainder exactly once, the requested duration
/// is added on top, and the start resets to `now`. Anything else opens
/// a fresh window.
pub fn extend_window(existing: &Mute, added: TimeDelta, now: DateTime<Utc>) -> Mute {
    match existing.start.filter(|_| existing.active()) {
        Some(start) => {
            let remaining = existing.duration() - (now - start) + added;
            Mute {
                start: Some(now),
                duration_ns: saturating_nanos(remaining),
            }
        }
        None => Mute::window(now, added),
    }
}

pub struct MuteService {
    directory: Arc<UserDirectory>,
    cache: Arc<dyn CacheStore>,
}

impl MuteService {
    pub fn new(directory: Arc<UserDirectory>, cache: Arc<dyn CacheStore>) -> Self {
        Self { directory, cache }
    }

    /// Buy a mute of `spec` against `target`, paid by `payer`.
    /// Returns the payer's new balance and the price charged.
    pub async fn mute(
        &self,
        payer: &str,
        target: &str,
        spec: &str,
    ) -> Result<(i64, i64), EconomyError> {
        let payer_user = self.directory.resolve_by_username(payer).await?;
        let target_user = self.directory.resolve_by_username(target).await?;

        let duration = parse_duration(spec)?;
        let cost = price(MuteKind::Mute, duration);

        if payer_user.balance < cost {
            info!(
                payer = %payer_user.username,
                balance = payer_user.balance,
                cost,
                "mute rejected: insufficient funds"
            );
            return Err(EconomyError::InsufficientFunds {
                balance: payer_user.balance,
                required: cost,
            });
        }

        let key = keys::mute(target_user.id);
        let existing = match self.cache.get(&key).await? {
            Some(raw) => serde_json::from_str::<Mute>(&raw)?,
            None => Mute::default(),
        };

        let window = extend_window(&existing, duration, Utc::now());

        // Debit first; if the persist below fails the payer stays
        // debited with no recorded mute. Accepted consistency gap, the
        // two tiers are not transactional.
        let balance = self
            .directory
            .set_balance(payer_user.id, payer_user.balance - cost)
            .await?;

        let payload = serde_json::to_string(&window)?;
        let ttl = window.duration().to_std().map_err(|_| EconomyError::Unknown)?;
        if let Err(err) = self.cache.set(&key, &payload, Some(ttl)).await {
            error!(target = target_user.id, %err, "failed to persist mute record after debit");
            return Err(EconomyError::Unknown);
        }

        info!(
            payer = payer_user.id,
            target = target_user.id,
            cost,
            remaining_ns = window.duration_ns,
            "mute applied"
        );
        Ok((balance, cost))
    }

    /// Buy out the rest of `target`'s active mute, paid by `payer`.
    /// Returns the payer's new balance and the price charged.
    pub async fn unmute(&self, payer: &str, target: &str) -> Result<(i64, i64), EconomyError> {
        let payer_user = self.directory.resolve_by_username(payer).await?;
        let target_user = self.directory.resolve_by_username(target).await?;

        let key = keys::mute(target_user.id);
        let stored = match self.cache.get(&key).await? {
            Some(raw) => serde_json::from_str::<Mute>(&raw)?,
            None => return Err(EconomyError::NotMuted),
        };
        if !stored.active() {
            return Err(EconomyError::NotMuted);
        }

        let remaining = stored.remaining_at(Utc::now());
        let cost = price(MuteKind::Unmute, remaining);

        if payer_user.balance < cost {
            info!(
                payer = %payer_user.username,
                balance = payer_user.balance,
                cost,
                "unmute rejected: insufficient funds"
            );
            return Err(EconomyError::InsufficientFunds {
                balance: payer_user.balance,
                required: cost,
            });
        }

        let balance = self
            .directory
            .set_balance(payer_user.id, payer_user.balance - cost)
            .await?;

        // full release, not a zero-remainder rewrite
        if let Err(err) = self.cache.delete(&key).await {
            error!(target = target_user.id, %err, "failed to delete mute record after debit");
            return Err(EconomyError::Unknown);
        }

        info!(payer = payer_user.id, target = target_user.id, cost, "unmute applied");
        Ok((balance, cost))
    }
}
