//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGINT → Shutdown::trigger()
//!
//! Shutdown (shutdown.rs):
//!     trigger → ShutdownSignal observed by the scheduler before each operation
//!             → pacing sleeps wake early
//!             → remaining operations recorded as cancelled
//! ```
//!
//! # Design Decisions
//! - Cancellation is cooperative and boundary-checked
//! - An in-flight submit is never aborted; its outcome must be recorded

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
