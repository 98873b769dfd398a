//! Opt-in retry helper for remote calls.
//!
//! Requests are never retried automatically. Callers that know a call is safe
//! to repeat wrap it in [`retry_request`].

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::ApiResult;

/// Default number of attempts, including the first one.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default base delay between attempts in milliseconds.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self { attempts, backoff }
    }

    /// A policy that runs the operation exactly once.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub async fn run<T, F, Fut>(&self, op: F) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        retry_request(op, self.attempts, self.backoff).await
    }
}

/// Run `op` up to `attempts` times.
///
/// Only failures that are not 4xx are retried. After the n-th failed attempt
/// the helper sleeps `backoff * n` before trying again. The last error is
/// returned unchanged.
pub async fn retry_request<T, F, Fut>(mut op: F, attempts: u32, backoff: Duration) -> ApiResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && e.is_retryable() => {
                let delay = backoff * attempt;
                warn!(
                    attempt,
                    attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Request failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
