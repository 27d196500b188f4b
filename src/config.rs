//! Ledger settings and the startup seed list

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::traits::{AcceptAnyPin, CredentialVerifier, RequireMatchingPin};
use crate::types::*;

/// How `login` treats the supplied PIN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinCheck {
    /// Any PIN is accepted once the account exists (legacy ATM behavior)
    #[default]
    Ignore,
    /// The PIN must equal the stored one
    Verify,
}

impl PinCheck {
    /// Build the verifier implementing this policy
    pub fn verifier(self) -> Box<dyn CredentialVerifier> {
        match self {
            PinCheck::Ignore => Box::new(AcceptAnyPin),
            PinCheck::Verify => Box::new(RequireMatchingPin),
        }
    }
}

/// Runtime settings for a [`crate::Ledger`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub pin_check: PinCheck,
    /// Upper bound on a single store call
    pub store_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            pin_check: PinCheck::Ignore,
            store_timeout: Duration::from_secs(5),
        }
    }
}

impl LedgerConfig {
    pub fn with_pin_check(mut self, pin_check: PinCheck) -> Self {
        self.pin_check = pin_check;
        self
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }
}

fn default_opening_balance() -> i64 {
    DEFAULT_OPENING_BALANCE
}

/// One account in the seed list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedAccount {
    pub pin: String,
    #[serde(default = "default_opening_balance")]
    pub balance: i64,
}

/// Accounts upserted into the store before the session starts.
///
/// Serialized as a JSON object keyed by account id:
///
/// ```json
/// { "Ali": { "pin": "1234", "balance": 1000 } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeedConfig {
    accounts: BTreeMap<String, SeedAccount>,
}

impl SeedConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// The two accounts the Baran Bank ATM ships with
    pub fn reference_default() -> Self {
        Self::new()
            .with_account("Ali", "1234", 1000)
            .with_account("Ece", "4321", 1000)
    }

    /// Add or replace an entry
    pub fn with_account(mut self, id: &str, pin: &str, balance: i64) -> Self {
        self.accounts.insert(
            id.to_string(),
            SeedAccount {
                pin: pin.to_string(),
                balance,
            },
        );
        self
    }

    /// Parse a seed list from a JSON document
    pub fn from_json_str(json: &str) -> LedgerResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| LedgerError::Config(format!("invalid seed document: {}", e)))
    }

    /// Read a seed list from a JSON file
    pub fn from_path<P: AsRef<Path>>(path: P) -> LedgerResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::Config(format!("cannot read seed file {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Entries in account id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SeedAccount)> {
        self.accounts.iter().map(|(id, seed)| (id.as_str(), seed))
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_from_json_defaults_balance() {
        let seed = SeedConfig::from_json_str(
            r#"{ "Ali": { "pin": "1234", "balance": 250 }, "Ece": { "pin": "4321" } }"#,
        )
        .unwrap();

        let entries: Vec<_> = seed.iter().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "Ali");
        assert_eq!(entries[0].1.balance, 250);
        assert_eq!(entries[1].0, "Ece");
        assert_eq!(entries[1].1.balance, DEFAULT_OPENING_BALANCE);
    }

    #[test]
    fn test_seed_from_malformed_json() {
        let err = SeedConfig::from_json_str(r#"{ "Ali": { "balance": 10 } }"#).unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }

    #[test]
    fn test_seed_from_missing_file() {
        let err = SeedConfig::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }

    #[test]
    fn test_seed_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        std::fs::write(&path, r#"{ "Ali": { "pin": "1234", "balance": 1000 } }"#).unwrap();

        let seed = SeedConfig::from_path(&path).unwrap();
        assert_eq!(seed, SeedConfig::new().with_account("Ali", "1234", 1000));
    }

    #[test]
    fn test_reference_default() {
        let seed = SeedConfig::reference_default();
        assert_eq!(seed.len(), 2);
        assert!(seed.iter().all(|(_, entry)| entry.balance == 1000));
    }

    #[test]
    fn test_pin_check_parses_from_json() {
        let check: PinCheck = serde_json::from_str(r#""verify""#).unwrap();
        assert_eq!(check, PinCheck::Verify);
        assert_eq!(LedgerConfig::default().pin_check, PinCheck::Ignore);
    }
}
