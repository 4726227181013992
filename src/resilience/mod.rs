//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Ledger read:
//!     → retries.rs (retry transport failures with backoff.rs delays)
//!
//! Ledger submit (never retried):
//!     → pacing.rs (token bucket slot) → submit → pacing.rs (fixed delay)
//! ```
//!
//! # Design Decisions
//! - Timeouts live in the HTTP transport; they surface as transport errors
//! - Retries only for reads; a broadcast with unknown outcome is not repeated
//! - One serialized submission stream keeps the remote call rate bounded

pub mod backoff;
pub mod pacing;
pub mod retries;

pub use pacing::Pacer;
