//! Per-account mutual exclusion for ledger operations

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockTable = HashMap<String, Arc<AsyncMutex<()>>>;

/// Table of one async mutex per account id.
///
/// Locks are always taken in ascending id order with duplicates removed, so
/// two operations touching the same pair of accounts in opposite directions
/// cannot deadlock and a self-transfer takes a single lock.
///
/// An entry lives only while some operation holds or waits for it; the last
/// guard to drop removes it.
#[derive(Debug, Default)]
pub struct AccountLocks {
    table: Arc<Mutex<LockTable>>,
}

/// Guards held for the duration of one ledger operation
#[derive(Debug)]
pub struct AccountGuards {
    table: Arc<Mutex<LockTable>>,
    held: Vec<(String, OwnedMutexGuard<()>)>,
}

// The table only maps ids to handles; a poisoned lock leaves it consistent.
fn lock_table(table: &Mutex<LockTable>) -> MutexGuard<'_, LockTable> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, account_id: &str) -> Arc<AsyncMutex<()>> {
        lock_table(&self.table)
            .entry(account_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Lock every listed account, waiting for operations already holding any of them
    pub async fn acquire(&self, account_ids: &[&str]) -> AccountGuards {
        let mut ids = account_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut guards = AccountGuards {
            table: Arc::clone(&self.table),
            held: Vec::with_capacity(ids.len()),
        };
        for id in ids {
            let guard = self.handle(id).lock_owned().await;
            guards.held.push((id.to_string(), guard));
        }
        guards
    }

    /// Number of accounts currently locked or waited on
    pub fn len(&self) -> usize {
        lock_table(&self.table).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for AccountGuards {
    fn drop(&mut self) {
        let mut table = lock_table(&self.table);
        for (id, guard) in self.held.drain(..) {
            drop(guard);
            // Waiters hold a clone of the handle, so only the table's copy is left when idle.
            if table.get(&id).is_some_and(|handle| Arc::strong_count(handle) == 1) {
                table.remove(&id);
            }
        }
    }
}
