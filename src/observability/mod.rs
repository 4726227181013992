//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! ledger client / scheduler / aggregator produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (text or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
