//! Cache key schema.
//!
//! Per-user fields live under independent keys rather than one blob per
//! user, so each field can carry its own TTL: the mute record decays
//! out on its own without ever touching the cached balance. The names
//! below are a stable contract with any other consumer of the cache.

pub const FIELD_USERNAME: &str = "username";
pub const FIELD_BALANCE: &str = "balance";
pub const FIELD_LEVEL: &str = "lvl";
pub const FIELD_INCOME: &str = "income";
pub const FIELD_MUTE: &str = "mute";

/// Pattern matching every cached balance key.
pub const BALANCE_PATTERN: &str = "user:*:balance";

/// Per-user scalar field key: `user:<id>:<field>`.
pub fn user_field(id: i64, field: &str) -> String {
    format!("user:{}:{}", id, field)
}

/// Reverse index from username to id: `username:<name>`.
pub fn username_index(username: &str) -> String {
    format!("username:{}", username)
}

/// Mute escrow record, stored with TTL equal to the remaining duration.
pub fn mute(id: i64) -> String {
    user_field(id, FIELD_MUTE)
}

/// Steal cooldown marker: `user:<id>:steal`.
pub fn steal_cooldown(id: i64) -> String {
    format!("user:{}:steal", id)
}

/// Extract the user id out of a `user:<id>:balance` key.
pub fn user_id_from_balance_key(key: &str) -> Option<i64> {
    key.strip_prefix("user:")?
        .strip_suffix(":balance")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_formats() {
        assert_eq!(user_field(42, FIELD_BALANCE), "user:42:balance");
        assert_eq!(user_field(42, FIELD_LEVEL), "user:42:lvl");
        assert_eq!(username_index("hamster"), "username:hamster");
        assert_eq!(mute(7), "user:7:mute");
        assert_eq!(steal_cooldown(7), "user:7:steal");
    }

    #[test]
    fn balance_key_roundtrip() {
        let key = user_field(1230045591, FIELD_BALANCE);
        assert_eq!(user_id_from_balance_key(&key), Some(1230045591));
    }

    #[test]
    fn balance_key_rejects_other_shapes() {
        assert_eq!(user_id_from_balance_key("user:42:income"), None);
        assert_eq!(user_id_from_balance_key("username:hamster"), None);
        assert_eq!(user_id_from_balance_key("user:abc:balance"), None);
    }
}
