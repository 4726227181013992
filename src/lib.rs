//! Bulk ledger-transaction orchestrator library

pub mod batch;
pub mod config;
pub mod ledger;
pub mod lifecycle;
pub mod observability;
pub mod report;
pub mod resilience;
pub mod wallet;

pub use batch::{BatchPlan, DispatchScheduler, Planner};
pub use config::OrchestratorConfig;
pub use ledger::{Ledger, LedgerClient};
pub use lifecycle::Shutdown;
pub use report::BatchReport;
pub use wallet::{LocalKeySigner, TransactionSigner, WalletSet};
