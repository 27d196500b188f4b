//! Core types and data structures for the ATM ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Opening balance given to a seeded account when the seed entry omits one
pub const DEFAULT_OPENING_BALANCE: i64 = 1000;

/// Core account structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for the account, also used as the login name
    pub id: String,
    /// Stored credential
    pub pin: String,
    /// Current balance, never negative
    pub balance: i64,
    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account stamped with the current time
    pub fn new(id: String, pin: String, balance: i64) -> Self {
        Self {
            id,
            pin,
            balance,
            created_at: Utc::now(),
        }
    }

    /// Take `amount` out of the account.
    ///
    /// Leaves the balance untouched when the amount is negative or larger than
    /// the balance. Withdrawing exactly the balance drains it to zero.
    pub fn withdraw(&mut self, amount: i64) -> Result<(), Rejection> {
        if amount < 0 {
            return Err(Rejection::NegativeAmount(amount));
        }
        if amount > self.balance {
            return Err(Rejection::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    /// Put `amount` into the account
    pub fn deposit(&mut self, amount: i64) -> Result<(), Rejection> {
        if amount < 0 {
            return Err(Rejection::NegativeAmount(amount));
        }
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(Rejection::Overflow {
                balance: self.balance,
                amount,
            })?;
        Ok(())
    }

    /// Snapshot of the fields shown on the account information screen
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id.clone(),
            balance: self.balance,
            created_at: self.created_at,
        }
    }
}

/// Account information without the credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: String,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
}

/// Why a ledger operation declined to act.
///
/// Rejections are expected outcomes, not faults: the ledger reports them to
/// callers as `false` / `None` and only logs the reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("account '{0}' does not exist")]
    AccountNotFound(String),
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: i64, requested: i64 },
    #[error("amount {0} is negative")]
    NegativeAmount(i64),
    #[error("adding {amount} to balance {balance} overflows")]
    Overflow { balance: i64, amount: i64 },
    #[error("PIN does not match")]
    PinMismatch,
}

/// Errors that can occur in the ledger system
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Storage call `{operation}` timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    /// Whether the store failed to complete a read or write
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Timeout { .. })
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
