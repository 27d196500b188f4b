//! Main ledger orchestrator that applies ATM operations to the account store

use tracing::instrument;
use uuid::Uuid;

use crate::config::{LedgerConfig, PinCheck, SeedConfig};
use crate::ledger::{AccountGuards, AccountLocks, AccountManager};
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_amount;

type Outcome = Result<(), Rejection>;

/// Main ledger system that orchestrates all ATM operations.
///
/// Each mutating operation locks the accounts it touches, re-reads them from
/// the store, validates, mutates and writes them back before releasing the
/// locks. Domain rejections come back as `Ok(false)` / `Ok(None)`; only store
/// failures are returned as errors.
pub struct Ledger<S: AccountStore> {
    account_manager: AccountManager<S>,
    verifier: Box<dyn CredentialVerifier>,
    locks: AccountLocks,
}

impl<S: AccountStore> Ledger<S> {
    /// Create a new ledger with the given storage backend and default settings
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, LedgerConfig::default())
    }

    /// Create a new ledger with explicit settings
    pub fn with_config(storage: S, config: LedgerConfig) -> Self {
        if config.pin_check == PinCheck::Ignore {
            tracing::warn!("PIN verification is disabled; login accepts any PIN for an existing account");
        }
        let verifier = config.pin_check.verifier();
        Self::with_verifier(storage, config, verifier)
    }

    /// Create a new ledger with a custom credential verifier
    pub fn with_verifier(
        storage: S,
        config: LedgerConfig,
        verifier: Box<dyn CredentialVerifier>,
    ) -> Self {
        Self {
            account_manager: AccountManager::new(storage, config.store_timeout),
            verifier,
            locks: AccountLocks::new(),
        }
    }

    /// Upsert the configured accounts
    #[instrument(skip_all, fields(accounts = seed.len()))]
    pub async fn seed(&self, seed: &SeedConfig) -> LedgerResult<Vec<Account>> {
        let ids: Vec<&str> = seed.iter().map(|(id, _)| id).collect();
        let _guards = self.locks.acquire(&ids).await;
        let accounts = self.account_manager.seed(seed).await?;
        tracing::info!(accounts = accounts.len(), "seeding complete");
        Ok(accounts)
    }

    /// Get an account by ID
    pub async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        self.account_manager.get_account(account_id).await
    }

    /// Check whether `account_id` may log in with `pin`
    #[instrument(skip(self, pin), fields(op_id = %Uuid::new_v4()))]
    pub async fn login(&self, account_id: &str, pin: &str) -> LedgerResult<bool> {
        let outcome = match self.account_manager.get_account(account_id).await? {
            Some(account) => self.verifier.verify(&account, pin),
            None => Err(Rejection::AccountNotFound(account_id.to_string())),
        };
        Ok(settle("login", outcome))
    }

    /// Take `amount` out of an account
    #[instrument(skip(self), fields(op_id = %Uuid::new_v4()))]
    pub async fn withdraw(&self, account_id: &str, amount: i64) -> LedgerResult<bool> {
        let outcome = self.try_withdraw(account_id, amount).await?;
        Ok(settle("withdraw", outcome))
    }

    /// Put `amount` into an account
    #[instrument(skip(self), fields(op_id = %Uuid::new_v4()))]
    pub async fn deposit(&self, account_id: &str, amount: i64) -> LedgerResult<bool> {
        let outcome = self.try_deposit(account_id, amount).await?;
        Ok(settle("deposit", outcome))
    }

    /// Move `amount` from `account_id` to `to`, both records changing together
    #[instrument(skip(self), fields(op_id = %Uuid::new_v4()))]
    pub async fn transfer(&self, account_id: &str, amount: i64, to: &str) -> LedgerResult<bool> {
        let outcome = self.try_transfer(account_id, amount, to).await?;
        Ok(settle("transfer", outcome))
    }

    /// Current balance, `None` when the account does not exist
    #[instrument(skip(self), fields(op_id = %Uuid::new_v4()))]
    pub async fn balance(&self, account_id: &str) -> LedgerResult<Option<i64>> {
        Ok(self
            .account_manager
            .get_account(account_id)
            .await?
            .map(|account| account.balance))
    }

    /// Id, balance and creation time, `None` when the account does not exist
    pub async fn account_summary(&self, account_id: &str) -> LedgerResult<Option<AccountSummary>> {
        Ok(self
            .account_manager
            .get_account(account_id)
            .await?
            .map(|account| account.summary()))
    }

    /// Close the underlying store
    pub async fn close(self) -> LedgerResult<()> {
        self.account_manager.close().await
    }

    async fn lock(&self, account_ids: &[&str]) -> AccountGuards {
        self.locks.acquire(account_ids).await
    }

    async fn try_withdraw(&self, account_id: &str, amount: i64) -> LedgerResult<Outcome> {
        let _guards = self.lock(&[account_id]).await;

        let Some(mut account) = self.account_manager.get_account(account_id).await? else {
            return Ok(Err(Rejection::AccountNotFound(account_id.to_string())));
        };
        if let Err(rejection) = account.withdraw(amount) {
            return Ok(Err(rejection));
        }
        self.account_manager.save_account(&account).await?;
        Ok(Ok(()))
    }

    async fn try_deposit(&self, account_id: &str, amount: i64) -> LedgerResult<Outcome> {
        let _guards = self.lock(&[account_id]).await;

        let Some(mut account) = self.account_manager.get_account(account_id).await? else {
            return Ok(Err(Rejection::AccountNotFound(account_id.to_string())));
        };
        if let Err(rejection) = account.deposit(amount) {
            return Ok(Err(rejection));
        }
        self.account_manager.save_account(&account).await?;
        Ok(Ok(()))
    }

    async fn try_transfer(&self, account_id: &str, amount: i64, to: &str) -> LedgerResult<Outcome> {
        if let Err(rejection) = validate_amount(amount) {
            return Ok(Err(rejection));
        }

        let _guards = self.lock(&[account_id, to]).await;

        let Some(mut sender) = self.account_manager.get_account(account_id).await? else {
            return Ok(Err(Rejection::AccountNotFound(account_id.to_string())));
        };

        // A self-transfer nets to zero; it only has to be affordable.
        if account_id == to {
            return Ok(sender.clone().withdraw(amount));
        }

        let Some(mut receiver) = self.account_manager.get_account(to).await? else {
            return Ok(Err(Rejection::AccountNotFound(to.to_string())));
        };
        if let Err(rejection) = sender.withdraw(amount) {
            return Ok(Err(rejection));
        }
        if let Err(rejection) = receiver.deposit(amount) {
            return Ok(Err(rejection));
        }

        self.account_manager
            .save_accounts(&[sender, receiver])
            .await?;
        Ok(Ok(()))
    }
}

/// Log the outcome of an operation and collapse it to the caller-facing flag
fn settle(operation: &'static str, outcome: Outcome) -> bool {
    match outcome {
        Ok(()) => {
            tracing::debug!(operation, "completed");
            true
        }
        Err(rejection) => {
            tracing::debug!(operation, %rejection, "rejected");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;

    async fn seeded_ledger() -> Ledger<MemoryStorage> {
        let ledger = Ledger::new(MemoryStorage::new());
        ledger
            .seed(&SeedConfig::reference_default())
            .await
            .unwrap();
        ledger
    }

    #[tokio::test]
    async fn test_ledger_basic_operations() {
        let ledger = seeded_ledger().await;

        assert!(ledger.withdraw("Ali", 400).await.unwrap());
        assert_eq!(ledger.balance("Ali").await.unwrap(), Some(600));

        assert!(ledger.deposit("Ali", 100).await.unwrap());
        assert_eq!(ledger.balance("Ali").await.unwrap(), Some(700));

        assert!(ledger.transfer("Ali", 700, "Ece").await.unwrap());
        assert_eq!(ledger.balance("Ali").await.unwrap(), Some(0));
        assert_eq!(ledger.balance("Ece").await.unwrap(), Some(1700));

        assert!(!ledger.withdraw("Ali", 1).await.unwrap());
        assert_eq!(ledger.balance("Ali").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_login_ignores_pin_by_default() {
        let ledger = seeded_ledger().await;

        assert!(ledger.login("Ali", "1234").await.unwrap());
        assert!(ledger.login("Ali", "wrong").await.unwrap());
        assert!(!ledger.login("Nobody", "1234").await.unwrap());
    }

    #[tokio::test]
    async fn test_login_verifies_pin_when_configured() {
        let config = LedgerConfig::default().with_pin_check(PinCheck::Verify);
        let ledger = Ledger::with_config(MemoryStorage::new(), config);
        ledger
            .seed(&SeedConfig::reference_default())
            .await
            .unwrap();

        assert!(ledger.login("Ali", "1234").await.unwrap());
        assert!(!ledger.login("Ali", "4321").await.unwrap());
    }

    #[tokio::test]
    async fn test_self_transfer_keeps_balance() {
        let ledger = seeded_ledger().await;

        assert!(ledger.transfer("Ali", 600, "Ali").await.unwrap());
        assert_eq!(ledger.balance("Ali").await.unwrap(), Some(1000));
        assert!(!ledger.transfer("Ali", 1001, "Ali").await.unwrap());
        assert_eq!(ledger.balance("Ali").await.unwrap(), Some(1000));
    }

    #[tokio::test]
    async fn test_negative_amounts_are_rejected() {
        let ledger = seeded_ledger().await;

        assert!(!ledger.withdraw("Ali", -1).await.unwrap());
        assert!(!ledger.deposit("Ali", -1).await.unwrap());
        assert!(!ledger.transfer("Ali", -1, "Ece").await.unwrap());
        assert_eq!(ledger.balance("Ali").await.unwrap(), Some(1000));
        assert_eq!(ledger.balance("Ece").await.unwrap(), Some(1000));
    }

    #[tokio::test]
    async fn test_transfer_receiver_overflow_is_rejected() {
        let ledger = Ledger::new(MemoryStorage::new());
        ledger
            .seed(
                &SeedConfig::new()
                    .with_account("Ali", "1234", 10)
                    .with_account("Rich", "0000", i64::MAX),
            )
            .await
            .unwrap();

        assert!(!ledger.transfer("Ali", 10, "Rich").await.unwrap());
        assert_eq!(ledger.balance("Ali").await.unwrap(), Some(10));
        assert_eq!(ledger.balance("Rich").await.unwrap(), Some(i64::MAX));
    }

    #[tokio::test]
    async fn test_failed_transfers_do_not_grow_lock_table() {
        let ledger = seeded_ledger().await;

        for i in 0..10_000 {
            let recipient = format!("typo{}", i);
            assert!(!ledger.transfer("Ali", 1, &recipient).await.unwrap());
        }
        assert!(ledger.locks.is_empty());
        assert_eq!(ledger.balance("Ali").await.unwrap(), Some(1000));
    }

    #[tokio::test]
    async fn test_account_summary() {
        let ledger = seeded_ledger().await;
        let stored = ledger.get_account("Ece").await.unwrap().unwrap();

        let summary = ledger.account_summary("Ece").await.unwrap().unwrap();
        assert_eq!(summary.id, "Ece");
        assert_eq!(summary.balance, 1000);
        assert_eq!(summary.created_at, stored.created_at);
        assert!(ledger.account_summary("Nobody").await.unwrap().is_none());
    }
}
