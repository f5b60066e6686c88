//! Retry policy for upstream calls.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::constants::retry;
use crate::error::AppError;

/// How many times to try an upstream call and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles for every later retry.
    pub base_delay: Duration,
    /// Ceiling on a single delay.
    pub max_delay: Duration,
    /// Whether 4xx responses (other than 429) are retried too. The hub's
    /// historical clients retried every non-2xx status, so this defaults on.
    pub retry_client_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: retry::MAX_ATTEMPTS,
            base_delay: Duration::from_millis(retry::BASE_DELAY_MS),
            max_delay: Duration::from_secs(retry::MAX_DELAY_SECONDS),
            retry_client_errors: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Self::default()
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_retry_client_errors(mut self, retry_client_errors: bool) -> Self {
        self.retry_client_errors = retry_client_errors;
        self
    }

    /// Delay before retry number `retry_index` (0-based): `base * 2^i`,
    /// capped at `max_delay`. Never decreases as the index grows.
    pub fn delay_for(&self, retry_index: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry_index);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Whether `error` is worth another attempt under this policy.
    ///
    /// Transient failures are always retried. Any other HTTP status is
    /// retried only when `retry_client_errors` is set.
    pub fn should_retry(&self, error: &AppError) -> bool {
        match error {
            AppError::ApiFetch(_) => true,
            other if self.retry_client_errors && other.is_http_status() => true,
            other => other.is_retryable(),
        }
    }
}

/// Runs `operation` until it succeeds, the policy gives up on an error, or
/// the attempt budget runs out. The last error is returned unchanged.
pub async fn with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, AppError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let attempts = policy.attempts();
    let mut attempt = 0u32;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => {
                let remaining = attempts - attempt - 1;
                if remaining == 0 || !policy.should_retry(&error) {
                    return Err(error);
                }
                let wait = policy.delay_for(attempt);
                warn!(
                    "{} failed: {}. Retrying in {:?} (attempt {}/{})",
                    label,
                    error,
                    wait,
                    attempt + 2,
                    attempts
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}
