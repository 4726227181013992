//! Batch planning and dispatch.
//!
//! # Data Flow
//! ```text
//! CLI command → planner.rs → BatchPlan (operations grouped by account)
//!     → scheduler.rs
//!         → lock.rs (advisory per-address lock)
//!         → preflight.rs (funds check against cached state)
//!         → nonce.rs (issue / confirm / release)
//!         → wallet signer → Ledger::submit
//!     → report::ResultAggregator → BatchReport
//! ```

pub mod lock;
pub mod nonce;
pub mod operation;
pub mod planner;
pub mod preflight;
pub mod scheduler;

pub use lock::AccountLocks;
pub use nonce::{NonceError, NonceSequencer};
pub use operation::{AccountGroup, BatchPlan, Operation, OperationKind};
pub use planner::Planner;
pub use preflight::{AccountLedgerState, Preflight, PreflightValidator};
pub use scheduler::{BatchError, DispatchScheduler};
