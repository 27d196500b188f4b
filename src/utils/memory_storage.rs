//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::traits::*;
use crate::types::*;

/// In-memory storage implementation for testing and development
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, HashMap<String, Account>>> {
        self.accounts
            .read()
            .map_err(|_| LedgerError::Storage("account map lock poisoned".to_string()))
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, HashMap<String, Account>>> {
        self.accounts
            .write()
            .map_err(|_| LedgerError::Storage("account map lock poisoned".to_string()))
    }
}

fn not_persisted(account_id: &str) -> LedgerError {
    LedgerError::Storage(format!("account '{}' is not persisted", account_id))
}

#[async_trait]
impl AccountStore for MemoryStorage {
    async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        Ok(self.read()?.get(account_id).cloned())
    }

    async fn upsert_account(
        &self,
        account_id: &str,
        pin: &str,
        balance: i64,
    ) -> LedgerResult<Account> {
        let mut accounts = self.write()?;
        let account = accounts
            .entry(account_id.to_string())
            .and_modify(|existing| {
                existing.pin = pin.to_string();
                existing.balance = balance;
            })
            .or_insert_with(|| Account::new(account_id.to_string(), pin.to_string(), balance));
        Ok(account.clone())
    }

    async fn save_account(&self, account: &Account) -> LedgerResult<()> {
        let mut accounts = self.write()?;
        match accounts.get_mut(&account.id) {
            Some(stored) => {
                stored.pin = account.pin.clone();
                stored.balance = account.balance;
                Ok(())
            }
            None => Err(not_persisted(&account.id)),
        }
    }

    async fn save_accounts(&self, accounts: &[Account]) -> LedgerResult<()> {
        let mut stored = self.write()?;
        if let Some(missing) = accounts.iter().find(|a| !stored.contains_key(&a.id)) {
            return Err(not_persisted(&missing.id));
        }

        for account in accounts {
            if let Some(record) = stored.get_mut(&account.id) {
                record.pin = account.pin.clone();
                record.balance = account.balance;
            }
        }
        Ok(())
    }

    async fn close(&self) -> LedgerResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_keeps_created_at() {
        let storage = MemoryStorage::new();

        let first = storage.upsert_account("Ali", "1234", 1000).await.unwrap();
        let second = storage.upsert_account("Ali", "9999", 50).await.unwrap();

        assert_eq!(second.pin, "9999");
        assert_eq!(second.balance, 50);
        assert_eq!(second.created_at, first.created_at);
    }

    #[tokio::test]
    async fn test_save_accounts_is_all_or_nothing() {
        let storage = MemoryStorage::new();
        let mut ali = storage.upsert_account("Ali", "1234", 1000).await.unwrap();
        ali.balance = 10;
        let ghost = Account::new("Ghost".to_string(), "0000".to_string(), 5);

        let err = storage
            .save_accounts(&[ali.clone(), ghost])
            .await
            .unwrap_err();
        assert!(err.is_persistence_failure());

        let stored = storage.get_account("Ali").await.unwrap().unwrap();
        assert_eq!(stored.balance, 1000);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let storage = MemoryStorage::new();
        let handle = storage.clone();

        storage.upsert_account("Ece", "4321", 1000).await.unwrap();
        assert!(handle.get_account("Ece").await.unwrap().is_some());
    }
}
