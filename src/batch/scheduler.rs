//! Ordered, paced execution of a batch plan.
//!
//! # Algorithm
//! ```text
//! for each account group (plan order):
//!     load balance + nonce once
//!     for each operation (plan order):
//!         cancelled?  → Skipped(BatchCancelled)
//!         preflight   → Insufficient: Skipped, nonce untouched
//!         issue nonce → sign → wait for a submission slot → submit
//!         Accepted    → confirm, debit cached balance
//!         otherwise   → release (same nonce goes to the next operation)
//!         record, pace
//!     pace between accounts
//! ```
//!
//! # Design Decisions
//! - One task, strictly sequential: nonce order per account and a bounded
//!   call rate both fall out of it
//! - Per-operation failures become outcomes; only account resolution and
//!   locking can fail the batch, and both happen before any network call
//! - An in-flight submit is never abandoned on cancellation

use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

use crate::batch::lock::AccountLocks;
use crate::batch::nonce::NonceSequencer;
use crate::batch::operation::{BatchPlan, Operation};
use crate::batch::preflight::{AccountLedgerState, Preflight, PreflightValidator};
use crate::config::{NetworkKind, OrchestratorConfig, PacingConfig};
use crate::ledger::{Address, Ledger, LedgerResult, SubmitResponse};
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::report::{BatchReport, OperationOutcome, Outcome, ResultAggregator, SkipReason};
use crate::resilience::Pacer;
use crate::wallet::{Account, SignError, TransactionSigner, WalletSet};

/// Errors that stop a batch before it starts.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("plan references account {0} which is not in the wallet set")]
    UnknownAccount(Address),

    #[error("account {0} is already in use by another batch")]
    AccountBusy(Address),
}

/// What happened to one operation, as far as pacing is concerned.
enum Dispatch {
    /// No round-trip was spent (preflight or signing skip).
    NotAttempted,
    /// A submit was sent, whatever its result.
    Attempted,
    /// Cancellation fired while waiting for a submission slot.
    Cancelled,
}

/// Drives one batch at a time against a ledger.
pub struct DispatchScheduler {
    ledger: Arc<dyn Ledger>,
    signer: Arc<dyn TransactionSigner>,
    network: NetworkKind,
    pacing: PacingConfig,
    signal: ShutdownSignal,
    locks: AccountLocks,
}

impl DispatchScheduler {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        signer: Arc<dyn TransactionSigner>,
        config: &OrchestratorConfig,
        signal: ShutdownSignal,
    ) -> Self {
        Self {
            ledger,
            signer,
            network: config.network.kind,
            pacing: config.pacing.clone(),
            signal,
            locks: AccountLocks::global().clone(),
        }
    }

    /// Use a private lock registry instead of the process-wide one.
    pub fn with_locks(mut self, locks: AccountLocks) -> Self {
        self.locks = locks;
        self
    }

    /// Execute `plan` with accounts from `wallets`.
    pub async fn run(&self, wallets: &WalletSet, plan: BatchPlan) -> Result<BatchReport, BatchError> {
        let batch_id = Uuid::new_v4();
        let total_operations = plan.len();

        let mut groups = Vec::with_capacity(plan.groups().len());
        for group in plan.into_groups() {
            let account = wallets
                .by_address(&group.address)
                .ok_or_else(|| BatchError::UnknownAccount(group.address.clone()))?;
            groups.push((account, group.operations));
        }

        let _guard = self
            .locks
            .acquire(batch_id, groups.iter().map(|(account, _)| &account.address))
            .map_err(BatchError::AccountBusy)?;

        tracing::info!(
            batch_id = %batch_id,
            network = %self.network,
            accounts = groups.len(),
            operations = total_operations,
            "Batch started"
        );

        let started = Instant::now();
        let mut aggregator = ResultAggregator::new(batch_id, self.network);
        let mut sequencer = NonceSequencer::new();
        let mut pacer = Pacer::new(&self.pacing);
        let mut signal = self.signal.clone();
        let mut cancelled = false;
        let group_count = groups.len();

        for (index, (account, operations)) in groups.into_iter().enumerate() {
            if cancelled || signal.is_triggered() {
                cancelled = true;
                skip_all(&mut aggregator, account, operations, SkipReason::BatchCancelled);
                continue;
            }

            let mut state = match self.load_state(&mut sequencer, account).await {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(
                        account_id = account.id,
                        address = %account.address,
                        error = %e,
                        "Could not read account state; skipping its operations"
                    );
                    for operation in operations {
                        aggregator.record(OperationOutcome::new(
                            account.id,
                            operation,
                            None,
                            Outcome::TransportFailed {
                                message: e.to_string(),
                            },
                        ));
                    }
                    continue;
                }
            };

            let mut remaining = operations.into_iter().peekable();
            while let Some(operation) = remaining.next() {
                if signal.is_triggered() {
                    cancelled = true;
                    let rest = std::iter::once(operation).chain(remaining.by_ref()).collect();
                    skip_all(&mut aggregator, account, rest, SkipReason::BatchCancelled);
                    break;
                }

                let dispatch = self
                    .dispatch_one(
                        account,
                        &mut state,
                        &mut sequencer,
                        &mut pacer,
                        &mut signal,
                        operation,
                        &mut aggregator,
                    )
                    .await;

                match dispatch {
                    Dispatch::Cancelled => {
                        cancelled = true;
                        let rest = remaining.by_ref().collect();
                        skip_all(&mut aggregator, account, rest, SkipReason::BatchCancelled);
                        break;
                    }
                    Dispatch::Attempted if remaining.peek().is_some() => {
                        pacer.between_operations(&mut signal).await;
                    }
                    _ => {}
                }
            }

            tracing::debug!(
                account_id = account.id,
                balance = state.balance,
                next_nonce = state.next_nonce,
                "Account group done"
            );

            if !cancelled && index + 1 < group_count {
                pacer.between_accounts(&mut signal).await;
            }
        }

        let report = aggregator.finish(cancelled);
        let summary = report.summary();
        metrics::record_batch(started.elapsed(), cancelled);
        tracing::info!(
            batch_id = %batch_id,
            total = summary.total,
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            rejected = summary.rejected,
            transport_failed = summary.transport_failed,
            cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch finished"
        );
        Ok(report)
    }

    async fn load_state(
        &self,
        sequencer: &mut NonceSequencer,
        account: &Account,
    ) -> LedgerResult<AccountLedgerState> {
        let balance = self.ledger.fetch_balance(&account.address).await?;
        let next_nonce = sequencer
            .ensure_initialized(self.ledger.as_ref(), &account.address)
            .await?;
        tracing::info!(
            account_id = account.id,
            address = %account.address,
            balance,
            nonce = next_nonce,
            "Account state loaded"
        );
        Ok(AccountLedgerState {
            address: account.address.clone(),
            balance,
            next_nonce,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn dispatch_one(
        &self,
        account: &Account,
        state: &mut AccountLedgerState,
        sequencer: &mut NonceSequencer,
        pacer: &mut Pacer,
        signal: &mut ShutdownSignal,
        operation: Operation,
        aggregator: &mut ResultAggregator,
    ) -> Dispatch {
        let kind = operation.kind.name();

        if let Preflight::Insufficient { shortfall } = PreflightValidator::check(state, &operation) {
            tracing::warn!(
                account_id = account.id,
                operation = kind,
                balance = state.balance,
                required = operation.min_required_balance,
                shortfall,
                "Insufficient funds, skipping"
            );
            aggregator.record(OperationOutcome::new(
                account.id,
                operation,
                None,
                Outcome::Skipped {
                    reason: SkipReason::InsufficientFunds { shortfall },
                },
            ));
            return Dispatch::NotAttempted;
        }

        let nonce = match sequencer.issue(&account.address) {
            Ok(nonce) => nonce,
            Err(e) => {
                tracing::error!(account_id = account.id, error = %e, "No nonce available");
                aggregator.record(OperationOutcome::new(
                    account.id,
                    operation,
                    None,
                    Outcome::TransportFailed {
                        message: e.to_string(),
                    },
                ));
                return Dispatch::NotAttempted;
            }
        };

        let draft = operation.to_draft(nonce, self.network);
        let signed = match self.signer.sign(account, &draft).await {
            Ok(signed) => signed,
            Err(e) => {
                sequencer.release(&account.address);
                tracing::warn!(account_id = account.id, nonce, operation = kind, error = %e, "Signing did not complete");
                let reason = match e {
                    SignError::UserCancelled => SkipReason::SigningCancelled,
                    SignError::Failed(message) => SkipReason::SigningFailed { message },
                };
                aggregator.record(OperationOutcome::new(
                    account.id,
                    operation,
                    None,
                    Outcome::Skipped { reason },
                ));
                return Dispatch::NotAttempted;
            }
        };

        if !pacer.acquire_submission(signal).await {
            sequencer.release(&account.address);
            aggregator.record(OperationOutcome::new(
                account.id,
                operation,
                None,
                Outcome::Skipped {
                    reason: SkipReason::BatchCancelled,
                },
            ));
            return Dispatch::Cancelled;
        }

        let outcome = match self.ledger.submit(&signed).await {
            Ok(SubmitResponse::Accepted { txid }) => {
                match sequencer.confirm(&account.address) {
                    Ok(next) => state.sync_nonce(next),
                    Err(e) => tracing::error!(account_id = account.id, error = %e, "Nonce confirm failed"),
                }
                state.balance = state.balance.saturating_sub(operation.spend());
                tracing::info!(
                    account_id = account.id,
                    nonce,
                    operation = kind,
                    txid = %txid,
                    "Transaction submitted"
                );
                Outcome::Submitted { txid }
            }
            Ok(SubmitResponse::Rejected { code, message }) => {
                sequencer.release(&account.address);
                tracing::warn!(
                    account_id = account.id,
                    nonce,
                    operation = kind,
                    code = %code,
                    message = %message,
                    "Transaction rejected"
                );
                Outcome::Rejected { code, message }
            }
            Err(e) => {
                sequencer.release(&account.address);
                tracing::warn!(
                    account_id = account.id,
                    nonce,
                    operation = kind,
                    error = %e,
                    "Submission outcome unknown; check the explorer before retrying this operation"
                );
                Outcome::TransportFailed {
                    message: e.to_string(),
                }
            }
        };

        aggregator.record(OperationOutcome::new(account.id, operation, Some(nonce), outcome));
        Dispatch::Attempted
    }
}

fn skip_all(
    aggregator: &mut ResultAggregator,
    account: &Account,
    operations: Vec<Operation>,
    reason: SkipReason,
) {
    for operation in operations {
        aggregator.record(OperationOutcome::new(
            account.id,
            operation,
            None,
            Outcome::Skipped {
                reason: reason.clone(),
            },
        ));
    }
}
