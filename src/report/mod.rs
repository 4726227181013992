//! Batch outcomes and reports.
//!
//! # Data Flow
//! ```text
//! scheduler → OperationOutcome → aggregator.rs (append-only, ordered)
//!     → BatchReport → store.rs (JSON file) / console.rs (summary + explorer links)
//! ```

pub mod aggregator;
pub mod console;
pub mod outcome;
pub mod store;

pub use aggregator::{BatchReport, ResultAggregator, Summary};
pub use outcome::{OperationOutcome, Outcome, SkipReason};
pub use store::ReportError;
