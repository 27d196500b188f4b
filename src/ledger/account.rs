//! Account management functionality

use std::future::Future;
use std::time::Duration;

use crate::config::SeedConfig;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{validate_account_record, validate_seed_account};

/// Run one read-only store call, turning an expired deadline into a persistence error
async fn with_timeout<T, F>(operation: &'static str, after: Duration, call: F) -> LedgerResult<T>
where
    F: Future<Output = LedgerResult<T>>,
{
    match tokio::time::timeout(after, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(operation, ?after, "store call timed out");
            Err(LedgerError::Timeout { operation, after })
        }
    }
}

/// Run one store write to completion.
///
/// Writes are not cancelled at the deadline because the store may already be
/// committing. Past the deadline the write is awaited and its real outcome
/// returned; the store bounds its own waits before the commit.
async fn run_write<T, F>(operation: &'static str, after: Duration, call: F) -> LedgerResult<T>
where
    F: Future<Output = LedgerResult<T>>,
{
    tokio::pin!(call);
    match tokio::time::timeout(after, &mut call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, ?after, "store write still in flight past deadline");
            let result = call.await;
            tracing::warn!(operation, ok = result.is_ok(), "late store write settled");
            result
        }
    }
}

/// Account manager owning the store handle.
///
/// Every call goes straight to the store; nothing is cached between calls.
pub struct AccountManager<S: AccountStore> {
    pub(crate) storage: S,
    timeout: Duration,
}

impl<S: AccountStore> AccountManager<S> {
    /// Create a new account manager whose store reads are bounded by `timeout`
    pub fn new(storage: S, timeout: Duration) -> Self {
        Self { storage, timeout }
    }

    /// Get an account by ID
    pub async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        with_timeout(
            "get_account",
            self.timeout,
            self.storage.get_account(account_id),
        )
        .await
    }

    /// Insert or overwrite an account's PIN and balance
    pub async fn upsert_account(
        &self,
        account_id: &str,
        pin: &str,
        balance: i64,
    ) -> LedgerResult<Account> {
        validate_account_record(account_id, balance)?;

        run_write(
            "upsert_account",
            self.timeout,
            self.storage.upsert_account(account_id, pin, balance),
        )
        .await
    }

    /// Write back one mutated account
    pub async fn save_account(&self, account: &Account) -> LedgerResult<()> {
        run_write("save_account", self.timeout, self.storage.save_account(account)).await
    }

    /// Write back several mutated accounts atomically
    pub async fn save_accounts(&self, accounts: &[Account]) -> LedgerResult<()> {
        run_write(
            "save_accounts",
            self.timeout,
            self.storage.save_accounts(accounts),
        )
        .await
    }

    /// Upsert every entry of the seed list.
    ///
    /// The whole list is validated before anything is written. Running the
    /// same list twice leaves the store in the same state as running it once.
    pub async fn seed(&self, seed: &SeedConfig) -> LedgerResult<Vec<Account>> {
        for (account_id, entry) in seed.iter() {
            validate_seed_account(account_id, entry)?;
        }

        let mut accounts = Vec::with_capacity(seed.len());
        for (account_id, entry) in seed.iter() {
            let account = self
                .upsert_account(account_id, &entry.pin, entry.balance)
                .await?;
            tracing::debug!(account_id, balance = account.balance, "seeded account");
            accounts.push(account);
        }
        Ok(accounts)
    }

    /// Close the store
    pub async fn close(&self) -> LedgerResult<()> {
        with_timeout("close", self.timeout, self.storage.close()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;

    fn manager() -> AccountManager<MemoryStorage> {
        AccountManager::new(MemoryStorage::new(), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let manager = manager();
        let seed = SeedConfig::reference_default();

        let first = manager.seed(&seed).await.unwrap();
        let second = manager.seed(&seed).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(manager.get_account("Ali").await.unwrap().unwrap().balance, 1000);
    }

    #[tokio::test]
    async fn test_seed_overwrites_pin_and_balance() {
        let manager = manager();
        manager
            .seed(&SeedConfig::new().with_account("Ali", "1234", 1000))
            .await
            .unwrap();
        manager
            .seed(&SeedConfig::new().with_account("Ali", "0000", 5))
            .await
            .unwrap();

        let ali = manager.get_account("Ali").await.unwrap().unwrap();
        assert_eq!(ali.pin, "0000");
        assert_eq!(ali.balance, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_past_deadline_reports_real_outcome() {
        let committed = run_write("save_account", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(7)
        })
        .await
        .unwrap();
        assert_eq!(committed, 7);

        let err = run_write::<(), _>("save_account", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Err(LedgerError::Storage("database is locked".to_string()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, LedgerError::Storage(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_past_deadline_times_out() {
        let err = with_timeout::<(), _>("get_account", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, LedgerError::Timeout { operation: "get_account", .. }));
    }

    #[tokio::test]
    async fn test_invalid_seed_writes_nothing() {
        let manager = manager();
        let seed = SeedConfig::new()
            .with_account("Ali", "1234", 1000)
            .with_account("Ece", "4321", -1);

        let err = manager.seed(&seed).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert!(manager.get_account("Ali").await.unwrap().is_none());
    }
}
