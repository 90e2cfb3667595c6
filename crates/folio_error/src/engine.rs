//! Engine error types for intents and batch failures.

/// Specific error conditions raised by the orchestration engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum EngineErrorKind {
    /// Intent is not allowed in the current session status
    #[display("Cannot {} while session is {}", intent, status)]
    InvalidTransition {
        /// The rejected intent
        intent: String,
        /// Status the session was in
        status: String,
    },
    /// Page does not exist in the session
    #[display("Page {} not found", _0)]
    PageNotFound(u32),
    /// Choice is not offered on the given page
    #[display("Choice '{}' is not offered on page {}", choice, page)]
    InvalidChoice {
        /// Page index
        page: u32,
        /// Rejected choice
        choice: String,
    },
    /// Fatal credential or permission failure
    #[display("Credential rejected: {}", _0)]
    Credential(String),
    /// Batch stopped on a non-fatal error
    #[display("Batch failed on page {}: {}", page, message)]
    BatchFailed {
        /// Page that failed
        page: u32,
        /// Error message
        message: String,
    },
}

/// Error type for engine operations.
///
/// # Examples
///
/// ```
/// use folio_error::{EngineError, EngineErrorKind};
///
/// let err = EngineError::new(EngineErrorKind::PageNotFound(7));
/// assert!(format!("{}", err).contains("Page 7"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Engine Error: {} at line {} in {}", kind, line, file)]
pub struct EngineError {
    /// The specific error condition
    pub kind: EngineErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl EngineError {
    /// Create a new EngineError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: EngineErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
