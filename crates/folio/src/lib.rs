//! Folio - illustrated story generation engine
//!
//! Folio turns a hero, an optional co-star and world, and a few creative
//! settings into an ordered book of illustrated pages. The engine owns
//! sequencing, cancellation, retries and state; an AI backend plugs in
//! through the [`StoryProvider`] trait and a persistence backend through
//! [`LibraryStore`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use folio::{FolioConfig, LaunchRequest, Persona, StorySession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     folio::init_telemetry("info")?;
//!
//!     let session = StorySession::new(MyProvider::new(), FolioConfig::load()?);
//!     let hero = Persona::new("Ada", "A lighthouse keeper", "art://ada");
//!     session.launch(LaunchRequest::new(hero)).await?;
//!
//!     session.continue_story("a storm rolls in").await?;
//!     println!("{} pages", session.snapshot().pages.len());
//!
//!     folio::shutdown_telemetry();
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! Folio is organized as a workspace with focused crates:
//!
//! - `folio_error` - Error types
//! - `folio_core` - Data model (pages, beats, personas, progress) and telemetry
//! - `folio_interface` - `StoryProvider` and `LibraryStore` traits
//! - `folio_cache` - Beat cache
//! - `folio_retry` - Configuration, per-stage deadlines and retry
//! - `folio_storage` - Filesystem library of personas, worlds and presets
//! - `folio_engine` - Reservations, cancellation, batches and the session
//!
//! This crate (`folio`) re-exports everything for convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub use folio_cache::*;
pub use folio_core::*;
pub use folio_engine::*;
pub use folio_error::*;
pub use folio_interface::*;
pub use folio_retry::*;
pub use folio_storage::*;
