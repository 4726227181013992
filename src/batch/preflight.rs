//! Local funds check before spending a nonce or a round-trip.

use serde::{Deserialize, Serialize};

use crate::batch::operation::Operation;
use crate::ledger::Address;

/// Cached ledger view of one account for the duration of a batch.
///
/// Read once on first use. The balance is a point-in-time estimate; the
/// scheduler debits it locally as operations are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLedgerState {
    pub address: Address,
    pub balance: u64,
    /// Mirror of the sequencer's next nonce, for logging. Nonces are only
    /// ever issued by `NonceSequencer`.
    pub next_nonce: u64,
}

impl AccountLedgerState {
    /// Follow the sequencer after a confirm. Never moves backwards.
    pub fn sync_nonce(&mut self, next: u64) {
        self.next_nonce = self.next_nonce.max(next);
    }
}

/// Verdict of a preflight check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preflight {
    Fundable,
    Insufficient { shortfall: u64 },
}

/// Stateless funds check.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreflightValidator;

impl PreflightValidator {
    pub fn check(state: &AccountLedgerState, operation: &Operation) -> Preflight {
        let required = operation.min_required_balance;
        if state.balance >= required {
            Preflight::Fundable
        } else {
            Preflight::Insufficient {
                shortfall: required - state.balance,
            }
        }
    }
}
