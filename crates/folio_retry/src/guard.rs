//! Cancellation-aware, deadline-bounded retry wrapper for provider calls.

use crate::{RetryConfig, TimeoutConfig};
use folio_core::Stage;
use folio_error::{ProviderError, ProviderErrorKind, ProviderResult, RetryableError};
use std::future::Future;
use tokio_retry2::{Retry, RetryError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Wraps each remote call with cancellation, a stage deadline and retries.
///
/// Cancellation always wins: it is checked before every attempt, raced
/// against every attempt and raced against the backoff sleeps. A cancelled
/// call returns [`ProviderErrorKind::Cancelled`] and is never retried.
///
/// # Example
///
/// ```
/// use folio_core::Stage;
/// use folio_error::ProviderResult;
/// use folio_retry::{RetryConfig, StageGuard, TimeoutConfig};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() {
/// let guard = StageGuard::new(RetryConfig::default(), TimeoutConfig::default());
/// let token = CancellationToken::new();
///
/// let result: ProviderResult<u32> = guard
///     .run(Stage::Beat, 1, &token, |_cancel| async { Ok(42) })
///     .await;
/// assert_eq!(result.unwrap(), 42);
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct StageGuard {
    retry: RetryConfig,
    timeouts: TimeoutConfig,
}

impl StageGuard {
    /// Create a guard from retry and timeout settings.
    pub fn new(retry: RetryConfig, timeouts: TimeoutConfig) -> Self {
        Self { retry, timeouts }
    }

    /// Retry settings in use.
    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    /// Deadline settings in use.
    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.timeouts
    }

    /// Run `op` for one stage of one page.
    ///
    /// `op` is invoked once per attempt with the stage token so the
    /// provider can observe cancellation itself.
    ///
    /// # Errors
    ///
    /// Returns the last error once retries are exhausted, the first
    /// non-retryable error, a timeout, or a cancellation.
    #[tracing::instrument(skip(self, token, op), fields(stage = %stage))]
    pub async fn run<T, F, Fut>(
        &self,
        stage: Stage,
        page: u32,
        token: &CancellationToken,
        op: F,
    ) -> ProviderResult<T>
    where
        F: Fn(CancellationToken) -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        if token.is_cancelled() {
            debug!("Stage cancelled before first attempt");
            return Err(ProviderError::cancelled());
        }

        let deadline = self.timeouts.for_stage(stage);
        let op_ref = &op;
        let cancel = token.clone();
        let mut attempt: u32 = 0;

        let action = move || {
            attempt += 1;
            let attempt_no = attempt;
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return Err(RetryError::Permanent(ProviderError::cancelled()));
                }

                let call = op_ref(cancel.clone());
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(ProviderError::cancelled()),
                    result = tokio::time::timeout(deadline, call) => match result {
                        Ok(result) => result,
                        Err(_) => Err(ProviderError::new(ProviderErrorKind::Timeout(format!(
                            "{} stage exceeded {}ms",
                            stage,
                            deadline.as_millis()
                        )))),
                    },
                };

                match outcome {
                    Ok(value) => Ok(value),
                    Err(e) if e.kind.is_cancellation() => Err(RetryError::Permanent(e)),
                    Err(e) if e.is_retryable() && attempt_no > e.retry_strategy_params().1 as u32 => {
                        warn!(attempt = attempt_no, error = %e.kind, "Retry budget for this error exhausted");
                        Err(RetryError::Permanent(e))
                    }
                    Err(e) if e.is_retryable() => {
                        warn!(attempt = attempt_no, error = %e.kind, "Transient error, will retry");
                        Err(RetryError::Transient {
                            retry_after: e.retry_after(),
                            err: e,
                        })
                    }
                    Err(e) => {
                        debug!(attempt = attempt_no, error = %e.kind, "Permanent error, failing immediately");
                        Err(RetryError::Permanent(e))
                    }
                }
            }
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(ProviderError::cancelled()),
            result = Retry::spawn(self.retry.delays(), action) => result,
        }
    }
}
