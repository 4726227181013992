//! Ledger integration subsystem.
//!
//! # Data Flow
//! ```text
//! scheduler / nonce sequencer / CLI
//!     → Ledger trait (fetch_nonce, fetch_balance, read_view, submit)
//!     → client.rs (HTTP round-trip with timeout; reads may retry)
//!     → clarity.rs (decode view results)
//! ```
//!
//! # Constraints
//! - Each call is a single round-trip unless the caller configured read retries
//! - `submit` is never retried: a transport failure leaves acceptance unknown
//! - Decode failures come back as typed errors, never panics

pub mod clarity;
pub mod client;
pub mod types;

use async_trait::async_trait;

pub use clarity::{ClarityError, ClarityValue};
pub use client::LedgerClient;
pub use types::{
    Address, ContractId, LedgerError, LedgerResult, SignedTransaction, SubmitResponse,
    UNKNOWN_ERROR_CODE,
};

/// Read/write gateway to the remote ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Next nonce the ledger expects from `address`.
    async fn fetch_nonce(&self, address: &Address) -> LedgerResult<u64>;

    /// Spendable balance of `address` in micro-units.
    async fn fetch_balance(&self, address: &Address) -> LedgerResult<u64>;

    /// Evaluate a read-only contract function.
    async fn read_view(
        &self,
        contract: &ContractId,
        function: &str,
        args: &[ClarityValue],
    ) -> LedgerResult<ClarityValue>;

    /// Broadcast a signed transaction. Not idempotent at the remote end.
    async fn submit(&self, tx: &SignedTransaction) -> LedgerResult<SubmitResponse>;
}
