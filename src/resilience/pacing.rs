//! Submission pacing.
//!
//! Two mechanisms bound the rate at which a batch hits the ledger:
//! fixed delays between operations and between accounts, and an optional
//! token bucket capping submissions per second. All waits wake early when
//! the batch is cancelled.

use std::time::{Duration, Instant};

use crate::config::PacingConfig;
use crate::lifecycle::ShutdownSignal;

/// A simple token bucket rate limiter.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_rate: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(per_second: u32) -> Self {
        let rate = per_second.max(1) as f64;
        Self {
            tokens: rate,
            capacity: rate,
            refill_rate: rate,
            last_update: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_update = now;
    }

    /// Take a token, or return how long until one is available.
    fn try_acquire(&mut self, now: Instant) -> Result<(), Duration> {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let missing = 1.0 - self.tokens;
            Err(Duration::from_secs_f64(missing / self.refill_rate))
        }
    }
}

/// Paces one batch. Owned by the scheduler for the batch's duration.
#[derive(Debug)]
pub struct Pacer {
    inter_operation: Duration,
    inter_account: Duration,
    bucket: Option<TokenBucket>,
}

impl Pacer {
    pub fn new(config: &PacingConfig) -> Self {
        Self {
            inter_operation: config.inter_operation(),
            inter_account: config.inter_account(),
            bucket: config.max_submissions_per_second.map(TokenBucket::new),
        }
    }

    /// Wait for a submission slot. Returns `false` if cancelled while waiting.
    pub async fn acquire_submission(&mut self, signal: &mut ShutdownSignal) -> bool {
        let Some(bucket) = self.bucket.as_mut() else {
            return true;
        };
        loop {
            match bucket.try_acquire(Instant::now()) {
                Ok(()) => return true,
                Err(wait) => {
                    tracing::debug!(wait_ms = wait.as_millis() as u64, "Submission rate cap reached");
                    if !signal.sleep(wait).await {
                        return false;
                    }
                }
            }
        }
    }

    /// Delay between two operations of one account.
    pub async fn between_operations(&self, signal: &mut ShutdownSignal) -> bool {
        signal.sleep(self.inter_operation).await
    }

    /// Delay between account groups.
    pub async fn between_accounts(&self, signal: &mut ShutdownSignal) -> bool {
        signal.sleep(self.inter_account).await
    }
}
