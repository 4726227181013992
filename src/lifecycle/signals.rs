//! OS signal handling.
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - First Ctrl-C cancels the batch at the next operation boundary
//! - Second Ctrl-C exits immediately

use std::sync::Arc;

use crate::lifecycle::shutdown::Shutdown;

/// Exit status used when the operator forces termination.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Spawn a task translating Ctrl-C into batch cancellation.
pub fn spawn_ctrl_c_handler(shutdown: Arc<Shutdown>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::warn!("Unable to listen for Ctrl-C; cancellation disabled");
            return;
        }
        tracing::warn!(
            "Cancellation requested; finishing the in-flight submission. Press Ctrl-C again to abort"
        );
        shutdown.trigger();

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::error!("Forced exit; the in-flight submission outcome is unknown");
            std::process::exit(FORCED_EXIT_CODE);
        }
    })
}
