//! Per-account nonce sequencing.
//!
//! # Design Decisions
//! - State per address is `Uninitialized → Ready(n)`; only `confirm` advances
//! - A failed or skipped submission releases its nonce, so the next
//!   operation reuses the same number and no gap is ever left at the remote
//! - The cold read happens once per address per batch

use std::collections::HashMap;
use thiserror::Error;

use crate::ledger::{Address, Ledger, LedgerResult};

#[derive(Debug, Error)]
pub enum NonceError {
    #[error("nonce for {0} not initialized")]
    Uninitialized(Address),
}

/// Authoritative next nonce per account for one batch.
#[derive(Debug, Default)]
pub struct NonceSequencer {
    next: HashMap<Address, u64>,
}

impl NonceSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cold-read the nonce for `address` unless already known.
    pub async fn ensure_initialized(
        &mut self,
        ledger: &dyn Ledger,
        address: &Address,
    ) -> LedgerResult<u64> {
        if let Some(next) = self.next.get(address) {
            return Ok(*next);
        }
        let next = ledger.fetch_nonce(address).await?;
        tracing::debug!(address = %address, nonce = next, "Nonce initialized");
        self.seed(address.clone(), next);
        Ok(next)
    }

    /// Initialize from an already-fetched value. Ignored if already ready.
    pub fn seed(&mut self, address: Address, next: u64) {
        self.next.entry(address).or_insert(next);
    }

    /// The nonce the next submission should carry. Does not advance.
    pub fn issue(&self, address: &Address) -> Result<u64, NonceError> {
        self.next
            .get(address)
            .copied()
            .ok_or_else(|| NonceError::Uninitialized(address.clone()))
    }

    /// Advance after the remote accepted the issued nonce.
    pub fn confirm(&mut self, address: &Address) -> Result<u64, NonceError> {
        let next = self
            .next
            .get_mut(address)
            .ok_or_else(|| NonceError::Uninitialized(address.clone()))?;
        *next += 1;
        Ok(*next)
    }

    /// Give the issued nonce back. State is unchanged.
    pub fn release(&mut self, address: &Address) {
        tracing::trace!(address = %address, nonce = ?self.next.get(address), "Nonce released");
    }

    pub fn next_nonce(&self, address: &Address) -> Option<u64> {
        self.next.get(address).copied()
    }
}
