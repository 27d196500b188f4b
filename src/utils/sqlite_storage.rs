//! SQLite storage implementation backed by an sqlx connection pool

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

use crate::traits::*;
use crate::types::*;

const CREATE_CLIENTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS clients (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        name       TEXT    NOT NULL UNIQUE,
        pin        TEXT    NOT NULL,
        balance    INTEGER NOT NULL DEFAULT 1000 CHECK (balance >= 0),
        created_at TEXT    NOT NULL
    )
"#;

/// Row type for the `clients` table
#[derive(Debug, Clone, sqlx::FromRow)]
struct ClientRow {
    name: String,
    pin: String,
    balance: i64,
    created_at: DateTime<Utc>,
}

impl From<ClientRow> for Account {
    fn from(row: ClientRow) -> Self {
        Self {
            id: row.name,
            pin: row.pin,
            balance: row.balance,
            created_at: row.created_at,
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

/// How long a call may wait for a pooled connection or a database lock
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(5);

/// Durable account store kept in a SQLite database.
///
/// The schema is created on connect. In-memory databases live only as long as
/// their single pooled connection, so such pools are pinned to one connection
/// that never expires.
///
/// Waiting for a connection or for another writer's lock is bounded by the
/// lock wait given at connect time; a write that cannot start in time fails
/// before anything is committed.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (creating if needed) the database at `database_url`,
    /// e.g. `sqlite://atm.db?mode=rwc` or `sqlite::memory:`
    pub async fn connect(database_url: &str) -> LedgerResult<Self> {
        Self::connect_with_lock_wait(database_url, DEFAULT_LOCK_WAIT).await
    }

    /// Like [`SqliteStorage::connect`], with an explicit bound on connection
    /// acquisition and `busy_timeout`
    pub async fn connect_with_lock_wait(
        database_url: &str,
        lock_wait: Duration,
    ) -> LedgerResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(lock_wait);
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

        let pool_options = SqlitePoolOptions::new().acquire_timeout(lock_wait);
        let pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;
        let storage = Self { pool };
        storage.create_schema().await?;
        tracing::debug!(database_url, ?lock_wait, "sqlite account store ready");
        Ok(storage)
    }

    /// Private in-memory database, for tests and throwaway sessions
    pub async fn in_memory() -> LedgerResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    async fn create_schema(&self) -> LedgerResult<()> {
        sqlx::query(CREATE_CLIENTS_TABLE)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn not_persisted(account_id: &str) -> LedgerError {
    LedgerError::Storage(format!("account '{}' is not persisted", account_id))
}

#[async_trait]
impl AccountStore for SqliteStorage {
    async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        let row = sqlx::query_as::<_, ClientRow>(
            "SELECT name, pin, balance, created_at FROM clients WHERE name = ?",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Account::from))
    }

    async fn upsert_account(
        &self,
        account_id: &str,
        pin: &str,
        balance: i64,
    ) -> LedgerResult<Account> {
        let row = sqlx::query_as::<_, ClientRow>(
            "INSERT INTO clients (name, pin, balance, created_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT(name) DO UPDATE SET pin = excluded.pin, balance = excluded.balance \
             RETURNING name, pin, balance, created_at",
        )
        .bind(account_id)
        .bind(pin)
        .bind(balance)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn save_account(&self, account: &Account) -> LedgerResult<()> {
        let result = sqlx::query("UPDATE clients SET pin = ?, balance = ? WHERE name = ?")
            .bind(&account.pin)
            .bind(account.balance)
            .bind(&account.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_persisted(&account.id));
        }
        Ok(())
    }

    async fn save_accounts(&self, accounts: &[Account]) -> LedgerResult<()> {
        // Dropping `tx` on an early return rolls the whole batch back.
        let mut tx = self.pool.begin().await?;
        for account in accounts {
            let result = sqlx::query("UPDATE clients SET pin = ?, balance = ? WHERE name = ?")
                .bind(&account.pin)
                .bind(account.balance)
                .bind(&account.id)
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() == 0 {
                return Err(not_persisted(&account.id));
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn close(&self) -> LedgerResult<()> {
        self.pool.close().await;
        Ok(())
    }
}
