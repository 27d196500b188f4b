//! Ledger module containing account management and the ATM operations

pub mod account;
pub mod core;
pub mod locks;

pub use account::*;
pub use self::core::*;
pub use locks::*;
