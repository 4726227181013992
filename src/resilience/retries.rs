//! Retry logic for ledger reads.
//!
//! # Design Decisions
//! - Only reads go through here; broadcasts are never retried
//! - Only transport failures are retried; protocol and decode errors are final
//! - Jittered exponential backoff between attempts

use std::future::Future;

use crate::config::RetryConfig;
use crate::ledger::LedgerResult;
use crate::resilience::backoff::calculate_backoff;

/// Run `op` up to `policy.max_read_attempts` times.
pub async fn with_retries<T, F, Fut>(policy: &RetryConfig, call: &'static str, mut op: F) -> LedgerResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LedgerResult<T>>,
{
    let attempts = policy.max_read_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < attempts => {
                let delay = calculate_backoff(attempt, policy.base_delay_ms, policy.max_delay_ms);
                tracing::warn!(
                    call,
                    attempt,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Ledger read failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
