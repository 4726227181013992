//! Ledger-facing types and error definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::ledger::clarity::ClarityError;

/// Account address on the remote ledger. Identity of an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for console output.
    pub fn short(&self) -> String {
        if self.0.len() <= 12 {
            self.0.clone()
        } else {
            format!("{}…{}", &self.0[..6], &self.0[self.0.len() - 4..])
        }
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AddressError("address is empty".to_string()));
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AddressError(format!("address '{}' has invalid characters", s)));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct AddressError(String);

/// A deployed contract: `ADDRESS.contract-name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractId {
    pub address: Address,
    pub name: String,
}

impl FromStr for ContractId {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, name) = s
            .split_once('.')
            .ok_or_else(|| AddressError(format!("contract id '{}' must be ADDRESS.name", s)))?;
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AddressError(format!("invalid contract name '{}'", name)));
        }
        Ok(Self {
            address: address.parse()?,
            name: name.to_string(),
        })
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.address, self.name)
    }
}

/// A signed transaction ready for broadcast.
///
/// `bytes` is the opaque payload produced by the signer; `sender` and `nonce`
/// are carried alongside for logging and bookkeeping only.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub sender: Address,
    pub nonce: u64,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for SignedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedTransaction")
            .field("sender", &self.sender)
            .field("nonce", &self.nonce)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// The remote's verdict on a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitResponse {
    /// Accepted into the mempool.
    Accepted { txid: String },
    /// Explicitly refused. `code` is the remote's reason, or
    /// [`UNKNOWN_ERROR_CODE`] when the payload could not be parsed.
    Rejected { code: String, message: String },
}

/// Error code used when a rejection payload carries no parseable reason.
pub const UNKNOWN_ERROR_CODE: &str = "UNKNOWN";

/// Errors that can occur while talking to the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Network failure, timeout, or server-side 5xx.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response did not have the expected shape.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A read-only contract call was refused by the node.
    #[error("View call failed: {0}")]
    ViewFailed(String),

    /// A view result could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] ClarityError),

    /// The configured base URL could not be used.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl LedgerError {
    /// Whether a read that failed this way may be attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Transport(_))
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parse() {
        let address: Address = "SP31G2FZ5JN87BATZMP4ZRYE5F7WZQDNEXJ7G7X97".parse().unwrap();
        assert_eq!(address.short(), "SP31G2…7X97");
        assert!("".parse::<Address>().is_err());
        assert!("SP3/../".parse::<Address>().is_err());
    }

    #[test]
    fn test_address_serde_validates() {
        let ok: Address = serde_json::from_str("\"ST1ABC\"").unwrap();
        assert_eq!(ok.as_str(), "ST1ABC");
        assert!(serde_json::from_str::<Address>("\"bad address\"").is_err());
    }

    #[test]
    fn test_contract_id_parse() {
        let id: ContractId = "SP31G2FZ5JN87BATZMP4ZRYE5F7WZQDNEXJ7G7X97.simple-nft-v4"
            .parse()
            .unwrap();
        assert_eq!(id.name, "simple-nft-v4");
        assert_eq!(id.to_string(), "SP31G2FZ5JN87BATZMP4ZRYE5F7WZQDNEXJ7G7X97.simple-nft-v4");
        assert!("SP31G2FZ5JN87".parse::<ContractId>().is_err());
        assert!("SP31.".parse::<ContractId>().is_err());
    }

    #[test]
    fn test_signed_transaction_debug_hides_bytes() {
        let tx = SignedTransaction {
            sender: "ST1ABC".parse().unwrap(),
            nonce: 4,
            bytes: vec![0xde, 0xad],
        };
        let debug = format!("{:?}", tx);
        assert!(debug.contains("len: 2"));
        assert!(!debug.contains("222"));
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "Transport error: connection refused");
        assert!(err.is_retryable());
        assert!(!LedgerError::Protocol("x".into()).is_retryable());
    }
}
