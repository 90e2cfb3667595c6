//! AI provider error types and retry classification.

use std::time::Duration;

/// Error conditions an AI provider adapter may raise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ProviderErrorKind {
    /// The network is unreachable or the provider could not be contacted
    #[display("Provider offline: {}", _0)]
    Offline(String),
    /// The API credential is missing, invalid or expired
    #[display("Invalid credential: {}", _0)]
    InvalidCredential(String),
    /// The credential is valid but lacks permission (billing, region, model access)
    #[display("Permission denied: {}", _0)]
    PermissionDenied(String),
    /// The provider asked us to slow down
    #[display("Rate limited")]
    RateLimited {
        /// Server-suggested delay before the next attempt
        retry_after_ms: Option<u64>,
    },
    /// A stage deadline elapsed before the provider answered
    #[display("Timed out: {}", _0)]
    Timeout(String),
    /// The response could not be parsed into the expected shape
    #[display("Malformed response: {}", _0)]
    MalformedResponse(String),
    /// HTTP error with status code and message
    #[display("HTTP {} error: {}", status_code, message)]
    Http {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },
    /// The operation was cancelled before or while it ran
    #[display("Operation cancelled")]
    Cancelled,
}

impl ProviderErrorKind {
    /// Build a kind from an HTTP status, mapping auth failures to credential kinds.
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 => ProviderErrorKind::InvalidCredential(message),
            403 => ProviderErrorKind::PermissionDenied(message),
            429 => ProviderErrorKind::RateLimited {
                retry_after_ms: None,
            },
            _ => ProviderErrorKind::Http {
                status_code,
                message,
            },
        }
    }

    /// Check if this error type should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderErrorKind::Offline(_)
            | ProviderErrorKind::RateLimited { .. }
            | ProviderErrorKind::Timeout(_)
            | ProviderErrorKind::MalformedResponse(_) => true,
            ProviderErrorKind::Http { status_code, .. } => {
                matches!(*status_code, 408 | 429 | 500 | 502 | 503 | 504)
            }
            _ => false,
        }
    }

    /// Credential and permission failures end the whole session.
    pub fn is_fatal(&self) -> bool {
        match self {
            ProviderErrorKind::InvalidCredential(_) | ProviderErrorKind::PermissionDenied(_) => {
                true
            }
            ProviderErrorKind::Http { status_code, .. } => matches!(*status_code, 401 | 403),
            _ => false,
        }
    }

    /// Whether this error only reports that the caller cancelled the work.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ProviderErrorKind::Cancelled)
    }

    /// Whether this error reports an unparseable provider response.
    pub fn is_malformed(&self) -> bool {
        matches!(self, ProviderErrorKind::MalformedResponse(_))
    }

    /// Get retry strategy parameters for this error type.
    ///
    /// Returns `(initial_backoff_ms, max_retries, max_delay_secs)`.
    pub fn retry_strategy_params(&self) -> (u64, usize, u64) {
        match self {
            ProviderErrorKind::RateLimited { .. } => (5000, 3, 40),
            ProviderErrorKind::Http { status_code, .. } => match *status_code {
                503 => (2000, 5, 60),
                500 | 502 | 504 => (1000, 3, 8),
                408 => (2000, 4, 30),
                _ => (2000, 5, 60),
            },
            ProviderErrorKind::Timeout(_) => (1000, 2, 10),
            ProviderErrorKind::MalformedResponse(_) => (500, 2, 2),
            _ => (2000, 5, 60),
        }
    }
}

/// Provider error with source location tracking.
///
/// # Examples
///
/// ```
/// use folio_error::{ProviderError, ProviderErrorKind};
///
/// let err = ProviderError::new(ProviderErrorKind::from_status(401, "API key expired"));
/// assert!(err.kind.is_fatal());
/// assert!(!err.kind.is_retryable());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Provider Error: {} at line {} in {}", kind, line, file)]
pub struct ProviderError {
    /// The kind of error that occurred
    pub kind: ProviderErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ProviderError {
    /// Create a new ProviderError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ProviderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for a cancellation error.
    #[track_caller]
    pub fn cancelled() -> Self {
        Self::new(ProviderErrorKind::Cancelled)
    }
}

/// Result type for provider calls.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Trait for errors that support retry logic.
///
/// Transient errors like 503 (service unavailable), 429 (rate limit),
/// network failures or timeouts should return true. Permanent errors like
/// 401 (unauthorized) or a cancellation should return false.
///
/// # Examples
///
/// ```
/// use folio_error::{ProviderError, ProviderErrorKind, RetryableError};
/// use std::time::Duration;
///
/// let err = ProviderError::new(ProviderErrorKind::RateLimited { retry_after_ms: Some(1500) });
/// assert!(err.is_retryable());
/// assert_eq!(err.retry_after(), Some(Duration::from_millis(1500)));
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    fn is_retryable(&self) -> bool;

    /// Server-suggested delay that overrides the backoff schedule.
    fn retry_after(&self) -> Option<Duration> {
        None
    }

    /// Get retry strategy parameters for this error.
    ///
    /// Returns `(initial_backoff_ms, max_retries, max_delay_secs)`.
    fn retry_strategy_params(&self) -> (u64, usize, u64) {
        (2000, 5, 60)
    }
}

impl RetryableError for ProviderError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    fn retry_after(&self) -> Option<Duration> {
        match self.kind {
            ProviderErrorKind::RateLimited {
                retry_after_ms: Some(ms),
            } => Some(Duration::from_millis(ms)),
            _ => None,
        }
    }

    fn retry_strategy_params(&self) -> (u64, usize, u64) {
        self.kind.retry_strategy_params()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(ProviderErrorKind::from_status(401, "expired").is_fatal());
        assert!(ProviderErrorKind::from_status(403, "billing").is_fatal());
        assert!(ProviderErrorKind::from_status(503, "overloaded").is_retryable());
        assert!(ProviderErrorKind::from_status(429, "slow down").is_retryable());
        assert!(!ProviderErrorKind::from_status(400, "bad request").is_retryable());
        assert!(!ProviderErrorKind::from_status(400, "bad request").is_fatal());
    }

    #[test]
    fn test_cancellation_is_neither_fatal_nor_retryable() {
        let kind = ProviderErrorKind::Cancelled;
        assert!(kind.is_cancellation());
        assert!(!kind.is_fatal());
        assert!(!kind.is_retryable());
    }

    #[test]
    fn test_malformed_is_retryable() {
        let kind = ProviderErrorKind::MalformedResponse("not json".to_string());
        assert!(kind.is_retryable());
        assert!(kind.is_malformed());
    }

    #[test]
    fn test_retry_strategy_params_by_kind() {
        let rate_limited = ProviderErrorKind::RateLimited {
            retry_after_ms: None,
        };
        assert_eq!(rate_limited.retry_strategy_params(), (5000, 3, 40));
        assert_eq!(
            ProviderErrorKind::from_status(502, "bad gateway").retry_strategy_params(),
            (1000, 3, 8)
        );
        let err = ProviderError::new(ProviderErrorKind::Offline("down".to_string()));
        assert_eq!(err.retry_strategy_params(), (2000, 5, 60));
    }
}
