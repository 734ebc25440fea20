use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backoff::future::retry_notify;
use backoff::{Error as BackoffError, ExponentialBackoff};

use crate::error::ApiError;

const MAX_DELAY: Duration = Duration::from_secs(10);

/// Exponential backoff for idempotent reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// A single attempt.
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Doubling intervals starting at `base_delay`, capped at ten seconds.
    /// The attempt cap is enforced by [`with_backoff`], not by elapsed time.
    pub fn to_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.base_delay,
            initial_interval: self.base_delay,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: MAX_DELAY,
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::config::DEFAULT_RETRY_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(crate::config::DEFAULT_RETRY_BASE_DELAY_MS),
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of attempts.
pub async fn with_backoff<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let attempts = AtomicU32::new(0);
    let attempts = &attempts;

    let operation = || {
        let call = op();
        async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            call.await.map_err(|e| {
                if e.is_retryable() && attempt < max_attempts {
                    BackoffError::transient(e)
                } else {
                    BackoffError::permanent(e)
                }
            })
        }
    };
    let log_failure = |error: ApiError, delay: Duration| {
        tracing::warn!(label, ?delay, error = %error, "Retrying upstream call");
    };

    retry_notify(policy.to_backoff(), operation, log_failure).await
}
