//! Retry - Re-issue a call until it succeeds, fails permanently, or runs out
//! of time
//!
//! Used from `call_error` hooks; the engine itself never retries transport
//! errors.

use std::future::Future;
use std::time::Duration;

use log::debug;
use tokio::time::Instant;

use crate::error::{ReconcileError, ReconcileResult};

pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Attempt outcome as classified by the caller
#[derive(Debug)]
pub enum RetryError {
    Retryable(ReconcileError),
    NonRetryable(ReconcileError),
}

impl RetryError {
    /// Retry exactly the errors whose vendor code is known to be transient
    pub fn classify(err: ReconcileError) -> Self {
        if err.is_retryable() {
            Self::Retryable(err)
        } else {
            Self::NonRetryable(err)
        }
    }
}

/// Run `attempt` every `interval` until it succeeds, returns a non-retryable
/// error, or `timeout` elapses. Exhausting the budget yields `TimedOut`
/// naming the last retryable error.
pub async fn retry<T, F, Fut>(timeout: Duration, interval: Duration, mut attempt: F) -> ReconcileResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetryError>>,
{
    let deadline = Instant::now() + timeout;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(RetryError::NonRetryable(err)) => return Err(err),
            Err(RetryError::Retryable(err)) => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(ReconcileError::TimedOut {
                        operation: format!("retrying after {} attempts, last error: {}", attempts, err),
                        timeout,
                    });
                }
                debug!("attempt {} failed with retryable error: {}", attempts, err);
                tokio::time::sleep_until((now + interval).min(deadline)).await;
            }
        }
    }
}
