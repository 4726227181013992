//! Source accounts and the wallet file.
//!
//! # Security
//! - Keys are parsed once at load time; a bad key is a configuration error
//! - Keys are never logged or serialized

use alloy::signers::local::PrivateKeySigner;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::config::ConfigError;
use crate::ledger::Address;

/// Signing capability of an account.
#[derive(Clone)]
pub struct SigningKey(PrivateKeySigner);

impl SigningKey {
    /// Parse a hex private key, with or without `0x`.
    ///
    /// A 33-byte key ending in `01` (compressed-public-key marker) is accepted.
    pub fn parse(private_key_hex: &str) -> Result<Self, String> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);
        let key_hex = match key_hex.len() {
            66 if key_hex.ends_with("01") => &key_hex[..64],
            _ => key_hex,
        };

        key_hex
            .parse::<PrivateKeySigner>()
            .map(Self)
            .map_err(|e| format!("invalid private key format: {}", e))
    }

    pub(crate) fn signer(&self) -> &PrivateKeySigner {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// One source account available to a batch.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: u32,
    pub address: Address,
    pub signing_key: SigningKey,
}

impl Account {
    pub fn new(id: u32, address: Address, signing_key: SigningKey) -> Self {
        Self {
            id,
            address,
            signing_key,
        }
    }

    /// Load an account from two environment variables (key and address).
    pub fn from_env(id: u32, key_var: &str, address_var: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(id, key_var, address_var, |var| std::env::var(var).ok())
    }

    pub(crate) fn from_lookup<F>(
        id: u32,
        key_var: &str,
        address_var: &str,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing = |var: &str| ConfigError::Env {
            var: var.to_string(),
            message: "not set".to_string(),
        };
        let key = lookup(key_var).ok_or_else(|| missing(key_var))?;
        let address = lookup(address_var).ok_or_else(|| missing(address_var))?;

        let signing_key = SigningKey::parse(&key).map_err(|message| ConfigError::Env {
            var: key_var.to_string(),
            message,
        })?;
        let address = address.parse::<Address>().map_err(|e| ConfigError::Env {
            var: address_var.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self::new(id, address, signing_key))
    }
}

#[derive(Deserialize)]
struct WalletFile {
    wallets: Vec<WalletEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletEntry {
    id: u32,
    address: String,
    private_key: String,
}

/// The fixed, ordered collection of accounts for a batch.
#[derive(Debug, Clone)]
pub struct WalletSet {
    accounts: Vec<Account>,
}

impl WalletSet {
    /// Build from accounts, rejecting an empty set and duplicate ids or addresses.
    pub fn new(accounts: Vec<Account>) -> Result<Self, ConfigError> {
        if accounts.is_empty() {
            return Err(ConfigError::Wallets("no wallets configured".to_string()));
        }
        let mut ids = HashSet::new();
        let mut addresses = HashSet::new();
        for account in &accounts {
            if !ids.insert(account.id) {
                return Err(ConfigError::Wallets(format!("duplicate wallet id {}", account.id)));
            }
            if !addresses.insert(&account.address) {
                return Err(ConfigError::Wallets(format!(
                    "duplicate wallet address {}",
                    account.address
                )));
            }
        }
        Ok(Self { accounts })
    }

    /// Load `{ "wallets": [ { id, address, privateKey } ] }` from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let set = Self::from_json(&content)?;
        tracing::info!(path = %path.display(), wallets = set.len(), "Wallets loaded");
        Ok(set)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let file: WalletFile = serde_json::from_str(content)
            .map_err(|e| ConfigError::Wallets(format!("malformed wallet file: {}", e)))?;

        let accounts = file
            .wallets
            .into_iter()
            .map(|entry| {
                let address = entry.address.parse::<Address>().map_err(|e| {
                    ConfigError::Wallets(format!("wallet {}: {}", entry.id, e))
                })?;
                let signing_key = SigningKey::parse(&entry.private_key).map_err(|e| {
                    ConfigError::Wallets(format!("wallet {}: {}", entry.id, e))
                })?;
                Ok(Account::new(entry.id, address, signing_key))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Self::new(accounts)
    }

    pub fn get(&self, id: u32) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    pub fn by_address(&self, address: &Address) -> Option<&Account> {
        self.accounts.iter().find(|a| &a.address == address)
    }

    /// Accounts in file order.
    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
