//! Balance transfers between users.
//!
//! The debit and the credit are two independent write-throughs with no
//! transaction around them; a failure in between leaves the transfer
//! half-applied. Accepted trade-off, same as everywhere else in the
//! engine.

use std::sync::Arc;
use tracing::info;

use crate::error::EconomyError;
use crate::users::{Payment, UserDirectory};

pub struct PaymentService {
    directory: Arc<UserDirectory>,
}

impl PaymentService {
    pub fn new(directory: Arc<UserDirectory>) -> Self {
        Self { directory }
    }

    /// Transfer `amount` from `from` to `to`.
    /// Returns the sender's new balance.
    pub async fn pay(&self, to: &str, from: &str, amount: i64) -> Result<i64, EconomyError> {
        let recipient = self.directory.resolve_by_username(to).await?;
        let sender = self.directory.resolve_by_username(from).await?;

        if sender.balance < amount {
            return Err(EconomyError::InsufficientFunds {
                balance: sender.balance,
                required: amount,
            });
        }
        if recipient.id == 0 {
            return Err(EconomyError::UserNotRegistered);
        }

        let balance = self
            .directory
            .set_balance(sender.id, sender.balance - amount)
            .await?;
        self.directory
            .set_balance(recipient.id, recipient.balance + amount)
            .await?;

        let record = Payment {
            to: recipient.id,
            from: sender.id,
            amount,
        };
        info!(?record, "payment executed");
        Ok(balance)
    }

    /// Credit `amount` to `to` from the unconditional admin source.
    /// No funds check on any account. Returns the recipient's new
    /// balance.
    pub async fn pay_admin(&self, to: &str, amount: i64) -> Result<i64, EconomyError> {
        let recipient = self.directory.resolve_by_username(to).await?;

        if recipient.id == 0 {
            return Err(EconomyError::UserNotRegistered);
        }

        let balance = self
            .directory
            .set_balance(recipient.id, recipient.balance + amount)
            .await?;

        info!(to = recipient.id, amount, "admin credit executed");
        Ok(balance)
    }
}
