//! Storage error types for the persistence collaborator.

/// Kinds of storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StorageErrorKind {
    /// Failed to create storage directory
    #[display("Failed to create storage directory: {}", _0)]
    DirectoryCreation(String),
    /// Failed to write file
    #[display("Failed to write file: {}", _0)]
    FileWrite(String),
    /// Failed to read file
    #[display("Failed to read file: {}", _0)]
    FileRead(String),
    /// Entity not found
    #[display("Not found: {}", _0)]
    NotFound(String),
    /// Invalid storage path or identifier
    #[display("Invalid storage path: {}", _0)]
    InvalidPath(String),
    /// Permission denied (e.g. access revoked)
    #[display("Permission denied: {}", _0)]
    PermissionDenied(String),
    /// Stored record could not be decoded
    #[display("Corrupt record: {}", _0)]
    Corrupt(String),
    /// Storage backend is unavailable
    #[display("Storage unavailable: {}", _0)]
    Unavailable(String),
}

impl StorageErrorKind {
    /// Whether the caller may retry the same operation later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageErrorKind::FileWrite(_)
                | StorageErrorKind::FileRead(_)
                | StorageErrorKind::Unavailable(_)
        )
    }
}

/// Storage error with location tracking.
///
/// # Examples
///
/// ```
/// use folio_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::PermissionDenied("/library".to_string()));
/// assert!(!err.kind.is_retryable());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The kind of error that occurred
    pub kind: StorageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StorageError {
    /// Create a new StorageError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Map an I/O failure, separating permission problems from transient ones.
    #[track_caller]
    pub fn from_io(context: impl std::fmt::Display, err: &std::io::Error, writing: bool) -> Self {
        let message = format!("{}: {}", context, err);
        let kind = match err.kind() {
            std::io::ErrorKind::PermissionDenied => StorageErrorKind::PermissionDenied(message),
            std::io::ErrorKind::NotFound => StorageErrorKind::NotFound(message),
            _ if writing => StorageErrorKind::FileWrite(message),
            _ => StorageErrorKind::FileRead(message),
        };
        Self::new(kind)
    }
}

/// Result type for persistence operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
