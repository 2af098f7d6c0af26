//! Engine-wide error type.
//!
//! Business rejections (not enough funds, unknown user) and
//! infrastructure failures (database, cache) share one enum so service
//! signatures stay uniform; `is_business` tells the transport which
//! ones are worth relaying to the chat verbatim.

use std::num::ParseIntError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EconomyError {
    #[error("user not found")]
    UserNotFound,

    #[error("user is not registered")]
    UserNotRegistered,

    #[error("insufficient funds: have {balance}, need {required}")]
    InsufficientFunds { balance: i64, required: i64 },

    #[error("invalid duration spec: {0}")]
    InvalidDuration(String),

    #[error("user is not muted")]
    NotMuted,

    #[error("cannot target yourself")]
    SelfTarget,

    #[error("target is shielded by a recent attempt")]
    CooldownActive,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt cached value: {0}")]
    CorruptValue(#[from] ParseIntError),

    #[error("internal error")]
    Unknown,
}

impl EconomyError {
    /// True for rejections caused by the request itself rather than by
    /// the engine's own machinery.
    pub fn is_business(&self) -> bool {
        matches!(
            self,
            EconomyError::UserNotFound
                | EconomyError::UserNotRegistered
                | EconomyError::InsufficientFunds { .. }
                | EconomyError::InvalidDuration(_)
                | EconomyError::NotMuted
                | EconomyError::SelfTarget
                | EconomyError::CooldownActive
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_are_flagged() {
        assert!(EconomyError::UserNotFound.is_business());
        assert!(
            EconomyError::InsufficientFunds {
                balance: 10,
                required: 100
            }
            .is_business()
        );
        assert!(EconomyError::CooldownActive.is_business());
        assert!(!EconomyError::Unknown.is_business());
    }

    #[test]
    fn parse_failure_converts() {
        let err: EconomyError = "abc".parse::<i64>().unwrap_err().into();
        assert!(matches!(err, EconomyError::CorruptValue(_)));
        assert!(!err.is_business());
    }

    #[test]
    fn messages_are_presentable() {
        let err = EconomyError::InsufficientFunds {
            balance: 10,
            required: 100,
        };
        assert_eq!(err.to_string(), "insufficient funds: have 10, need 100");
        assert_eq!(
            EconomyError::InvalidDuration("10d".into()).to_string(),
            "invalid duration spec: 10d"
        );
    }
}
