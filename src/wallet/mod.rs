//! Source accounts and signing.
//!
//! # Data Flow
//! ```text
//! wallets.json / SOURCE_* env → account.rs (WalletSet, Account)
//! scheduler → TransactionDraft → signer.rs (TransactionSigner) → SignedTransaction
//! ```

pub mod account;
pub mod signer;

pub use account::{Account, SigningKey, WalletSet};
pub use signer::{
    ClarityArg, LocalKeySigner, SignError, TransactionDraft, TransactionPayload,
    TransactionSigner,
};
