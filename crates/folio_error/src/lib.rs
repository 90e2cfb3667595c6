//! Error types for the Folio narrative generation engine.
//!
//! This crate provides the foundation error types used throughout the Folio workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! Provider errors additionally classify themselves for the retry layer
//! through [`RetryableError`], and for the orchestrator through
//! [`ProviderErrorKind::is_fatal`] and [`ProviderErrorKind::is_cancellation`].
//!
//! # Examples
//!
//! ```
//! use folio_error::{FolioResult, ProviderError, ProviderErrorKind};
//!
//! fn render() -> FolioResult<String> {
//!     Err(ProviderError::new(ProviderErrorKind::Offline("no route".to_string())))?
//! }
//!
//! assert!(render().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod json;
mod provider;
mod storage;

pub use config::ConfigError;
pub use engine::{EngineError, EngineErrorKind};
pub use error::{FolioError, FolioErrorKind, FolioResult};
pub use json::JsonError;
pub use provider::{ProviderError, ProviderErrorKind, ProviderResult, RetryableError};
pub use storage::{StorageError, StorageErrorKind, StorageResult};
