//! Per-operation outcomes.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::batch::operation::Operation;
use crate::ledger::Address;

/// Why an operation was not attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    InsufficientFunds { shortfall: u64 },
    SigningCancelled,
    SigningFailed { message: String },
    BatchCancelled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::InsufficientFunds { shortfall } => {
                write!(f, "insufficient funds (short {} micro-units)", shortfall)
            }
            SkipReason::SigningCancelled => write!(f, "signing cancelled"),
            SkipReason::SigningFailed { message } => write!(f, "signing failed: {}", message),
            SkipReason::BatchCancelled => write!(f, "batch cancelled"),
        }
    }
}

/// Terminal classification of one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Skipped { reason: SkipReason },
    Submitted { txid: String },
    Rejected { code: String, message: String },
    TransportFailed { message: String },
}

impl Outcome {
    /// Label used for metrics and console output.
    pub fn status(&self) -> &'static str {
        match self {
            Outcome::Skipped { .. } => "skipped",
            Outcome::Submitted { .. } => "submitted",
            Outcome::Rejected { .. } => "rejected",
            Outcome::TransportFailed { .. } => "transport_failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Submitted { .. })
    }
}

/// One row of the batch report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub account_id: u32,
    pub address: Address,
    pub operation: Operation,
    /// Nonce carried by the submission; `None` when nothing was submitted.
    pub nonce: Option<u64>,
    pub outcome: Outcome,
    /// Unix milliseconds at which the outcome was decided.
    pub timestamp_issued: u64,
}

impl OperationOutcome {
    pub fn new(account_id: u32, operation: Operation, nonce: Option<u64>, outcome: Outcome) -> Self {
        Self {
            account_id,
            address: operation.account.clone(),
            operation,
            nonce,
            outcome,
            timestamp_issued: now_unix_ms(),
        }
    }
}

/// Milliseconds since the Unix epoch (0 if the clock is before it).
pub fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
