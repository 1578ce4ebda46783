//! Retrying calls to the hosted backend.
//!
//! Listing pages, deleting batches and reading reference rows are all
//! idempotent, so a call that failed with a transient error (timeouts,
//! connection resets, 408/429/5xx) is simply repeated with exponential
//! backoff. Authentication failures and other 4xx responses are returned
//! immediately.

use backon::{ExponentialBuilder, Retryable};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Backoff settings for one backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub retries: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Delay multiplier between consecutive retries.
    pub factor: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::hosted()
    }
}

impl RetryConfig {
    /// Settings for the hosted REST APIs.
    #[must_use]
    pub fn hosted() -> Self {
        Self {
            retries: 3,
            min_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            factor: 2.0,
        }
    }

    /// Single attempt, no retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            retries: 0,
            ..Self::hosted()
        }
    }

    #[must_use]
    pub const fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    #[must_use]
    pub const fn with_min_delay(mut self, delay: Duration) -> Self {
        self.min_delay = delay;
        self
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.retries as usize)
            .with_factor(self.factor)
            .with_jitter()
    }
}

/// Runs `call`, retrying while `is_transient` holds for the error.
///
/// `what` names the call in retry warnings. Returns the last error once
/// the retries are exhausted.
pub async fn retry_async<F, Fut, T, E, P>(
    config: &RetryConfig,
    what: &str,
    call: F,
    is_transient: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let retries = config.retries;
    let mut attempt = 0u32;

    call.retry(config.backoff())
        .when(move |e| is_transient(e))
        .notify(|err: &E, delay: Duration| {
            attempt += 1;
            warn!(
                call = what,
                attempt,
                retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Backend call failed, retrying"
            );
        })
        .await
}

/// True for HTTP statuses worth retrying.
#[must_use]
pub const fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}
