//! Transaction signing.
//!
//! The scheduler hands a [`TransactionDraft`] to a [`TransactionSigner`] and
//! broadcasts whatever comes back. The ledger's binary transaction format is
//! owned by the signer implementation; [`LocalKeySigner`] produces a signed
//! envelope over the draft's canonical JSON.

use alloy::primitives::keccak256;
use alloy::signers::Signer;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::NetworkKind;
use crate::ledger::{Address, ContractId, SignedTransaction};
use crate::wallet::account::Account;

/// A contract-call argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ClarityArg {
    Uint(u128),
    Principal(Address),
}

/// What the transaction does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionPayload {
    ContractCall {
        contract: ContractId,
        function: String,
        args: Vec<ClarityArg>,
    },
    TokenTransfer {
        recipient: Address,
        amount: u64,
        memo: String,
    },
}

/// An unsigned transaction with its nonce and fee fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub sender: Address,
    pub nonce: u64,
    pub fee: u64,
    pub network: NetworkKind,
    pub payload: TransactionPayload,
}

impl TransactionDraft {
    /// Deterministic byte form that gets signed.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, SignError> {
        serde_json::to_vec(self).map_err(|e| SignError::Failed(format!("encode draft: {}", e)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignError {
    /// The operator declined to sign (interactive signers only).
    #[error("signing cancelled by user")]
    UserCancelled,

    #[error("signing failed: {0}")]
    Failed(String),
}

/// Turns drafts into broadcastable transactions.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    async fn sign(
        &self,
        account: &Account,
        draft: &TransactionDraft,
    ) -> Result<SignedTransaction, SignError>;
}

/// Signs with the account's own key, without prompting.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalKeySigner;

/// Length of the recoverable signature appended to the envelope.
pub const SIGNATURE_LEN: usize = 65;

#[async_trait]
impl TransactionSigner for LocalKeySigner {
    async fn sign(
        &self,
        account: &Account,
        draft: &TransactionDraft,
    ) -> Result<SignedTransaction, SignError> {
        if draft.sender != account.address {
            return Err(SignError::Failed(format!(
                "draft sender {} does not match account {}",
                draft.sender, account.id
            )));
        }

        let mut bytes = draft.canonical_bytes()?;
        let digest = keccak256(&bytes);
        let signature = account
            .signing_key
            .signer()
            .sign_hash(&digest)
            .await
            .map_err(|e| SignError::Failed(e.to_string()))?;
        bytes.extend_from_slice(&signature.as_bytes());

        tracing::debug!(
            account_id = account.id,
            nonce = draft.nonce,
            len = bytes.len(),
            "Transaction signed"
        );

        Ok(SignedTransaction {
            sender: draft.sender.clone(),
            nonce: draft.nonce,
            bytes,
        })
    }
}
