//! Validation utilities

use crate::config::SeedAccount;
use crate::types::*;

/// Validate that an amount is not negative. Zero is allowed and acts as a no-op.
pub fn validate_amount(amount: i64) -> Result<(), Rejection> {
    if amount < 0 {
        Err(Rejection::NegativeAmount(amount))
    } else {
        Ok(())
    }
}

/// Validate that an account ID is usable as a login name
pub fn validate_account_id(account_id: &str) -> LedgerResult<()> {
    if account_id.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Account ID cannot be empty".to_string(),
        ));
    }

    if account_id.trim() != account_id {
        return Err(LedgerError::Validation(format!(
            "Account ID '{}' cannot start or end with whitespace",
            account_id
        )));
    }

    Ok(())
}

/// Validate an upsert before it reaches the store
pub fn validate_account_record(account_id: &str, balance: i64) -> LedgerResult<()> {
    validate_account_id(account_id)?;

    if balance < 0 {
        return Err(LedgerError::Validation(format!(
            "Account '{}' cannot have a negative balance ({})",
            account_id, balance
        )));
    }

    Ok(())
}

/// Validate one entry of the seed list
pub fn validate_seed_account(account_id: &str, seed: &SeedAccount) -> LedgerResult<()> {
    validate_account_record(account_id, seed.balance)
}
