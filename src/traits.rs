//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use std::sync::Arc;

use crate::types::*;

/// Storage abstraction for account records
///
/// This trait allows the ledger to work with any storage backend
/// (SQLite, in-memory, etc.) by implementing these methods. Records are
/// keyed by account id and the store is the only owner of persisted state.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Get an account by ID, `None` when absent
    async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>>;

    /// Insert the account, or overwrite `pin` and `balance` of an existing one.
    ///
    /// `created_at` is set on insert and never changed by an update.
    async fn upsert_account(
        &self,
        account_id: &str,
        pin: &str,
        balance: i64,
    ) -> LedgerResult<Account>;

    /// Persist a previously fetched, now mutated account
    async fn save_account(&self, account: &Account) -> LedgerResult<()>;

    /// Persist several fetched accounts as one unit: either every record is
    /// written or none is
    async fn save_accounts(&self, accounts: &[Account]) -> LedgerResult<()>;

    /// Release the underlying connection
    async fn close(&self) -> LedgerResult<()>;
}

#[async_trait]
impl<T: AccountStore + ?Sized> AccountStore for Arc<T> {
    async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        (**self).get_account(account_id).await
    }

    async fn upsert_account(
        &self,
        account_id: &str,
        pin: &str,
        balance: i64,
    ) -> LedgerResult<Account> {
        (**self).upsert_account(account_id, pin, balance).await
    }

    async fn save_account(&self, account: &Account) -> LedgerResult<()> {
        (**self).save_account(account).await
    }

    async fn save_accounts(&self, accounts: &[Account]) -> LedgerResult<()> {
        (**self).save_accounts(accounts).await
    }

    async fn close(&self) -> LedgerResult<()> {
        (**self).close().await
    }
}

/// Trait for deciding whether a login attempt presents valid credentials
pub trait CredentialVerifier: Send + Sync {
    /// Check the supplied PIN against a stored account
    fn verify(&self, account: &Account, pin: &str) -> Result<(), Rejection>;
}

/// Accepts any PIN once the account exists.
///
/// This is how the Baran Bank ATM has always behaved: it never compared the
/// PIN at login.
pub struct AcceptAnyPin;

impl CredentialVerifier for AcceptAnyPin {
    fn verify(&self, _account: &Account, _pin: &str) -> Result<(), Rejection> {
        Ok(())
    }
}

/// Requires the supplied PIN to equal the stored one
pub struct RequireMatchingPin;

impl CredentialVerifier for RequireMatchingPin {
    fn verify(&self, account: &Account, pin: &str) -> Result<(), Rejection> {
        if account.pin == pin {
            Ok(())
        } else {
            Err(Rejection::PinMismatch)
        }
    }
}
