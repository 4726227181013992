//! Outcome accumulation and summary statistics.
//!
//! Outcomes are append-only and kept in record order. Every statistic is
//! derived from the stored outcomes on demand; there are no running counters.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::NetworkKind;
use crate::observability::metrics;
use crate::report::outcome::{now_unix_ms, Outcome, OperationOutcome};

/// Derived statistics over a set of outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub transport_failed: usize,
    /// Value (excluding fees) carried by submitted operations.
    pub total_value_moved: u64,
    /// Fees attached to submitted operations.
    pub total_fees: u64,
}

impl Summary {
    pub fn from_outcomes<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = &'a OperationOutcome>,
    {
        let mut summary = Summary::default();
        for row in outcomes {
            summary.total += 1;
            match &row.outcome {
                Outcome::Submitted { .. } => {
                    summary.succeeded += 1;
                    summary.total_value_moved =
                        summary.total_value_moved.saturating_add(row.operation.value);
                    summary.total_fees = summary.total_fees.saturating_add(row.operation.fee);
                }
                Outcome::Skipped { .. } => summary.skipped += 1,
                Outcome::Rejected { .. } => summary.rejected += 1,
                Outcome::TransportFailed { .. } => summary.transport_failed += 1,
            }
        }
        summary
    }

    /// Operations that were attempted or planned but did not succeed.
    pub fn failure_count(&self) -> usize {
        self.total - self.succeeded
    }

    /// Whether the batch had work and none of it succeeded.
    pub fn all_failed(&self) -> bool {
        self.total > 0 && self.succeeded == 0
    }
}

/// The finished record of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub network: NetworkKind,
    /// Unix milliseconds.
    pub started_at: u64,
    pub finished_at: u64,
    /// Set when the batch stopped early on request.
    pub cancelled: bool,
    pub outcomes: Vec<OperationOutcome>,
}

impl BatchReport {
    pub fn summary(&self) -> Summary {
        Summary::from_outcomes(&self.outcomes)
    }
}

/// Collects outcomes for one batch.
#[derive(Debug)]
pub struct ResultAggregator {
    batch_id: Uuid,
    network: NetworkKind,
    started_at: u64,
    outcomes: Vec<OperationOutcome>,
}

impl ResultAggregator {
    pub fn new(batch_id: Uuid, network: NetworkKind) -> Self {
        Self {
            batch_id,
            network,
            started_at: now_unix_ms(),
            outcomes: Vec::new(),
        }
    }

    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }

    pub fn record(&mut self, outcome: OperationOutcome) {
        metrics::record_outcome(outcome.outcome.status());
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[OperationOutcome] {
        &self.outcomes
    }

    pub fn summary(&self) -> Summary {
        Summary::from_outcomes(&self.outcomes)
    }

    pub fn finish(self, cancelled: bool) -> BatchReport {
        BatchReport {
            batch_id: self.batch_id,
            network: self.network,
            started_at: self.started_at,
            finished_at: now_unix_ms(),
            cancelled,
            outcomes: self.outcomes,
        }
    }
}
