//! # ATM Ledger
//!
//! The account ledger behind the Baran Bank ATM: named accounts with a PIN
//! and an integer balance, and the operations an ATM session performs on them.
//!
//! ## Features
//!
//! - **Ledger operations**: login, withdraw, deposit, transfer and balance inquiry
//! - **Consistency**: balances never go negative and transfers apply both sides atomically
//! - **Concurrency**: per-account locks taken in a fixed order, bounded store calls
//! - **Storage abstraction**: trait-based store with in-memory and SQLite backends
//! - **Seeding**: idempotent startup upsert of configured accounts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use atm_ledger::utils::MemoryStorage;
//! use atm_ledger::{Ledger, SeedConfig};
//!
//! # async fn demo() -> atm_ledger::LedgerResult<()> {
//! let ledger = Ledger::new(MemoryStorage::new());
//! ledger.seed(&SeedConfig::reference_default()).await?;
//!
//! assert!(ledger.withdraw("Ali", 400).await?);
//! assert_eq!(ledger.balance("Ali").await?, Some(600));
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod ledger;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use ledger::*;
pub use traits::*;
pub use types::*;
