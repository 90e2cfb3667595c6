//! Generation orchestration engine for Folio.
//!
//! This crate turns reader intents (launch, continue, choose, abort, reset)
//! into a sequenced, cancellable, retryable pipeline of provider calls that
//! fills an ordered book of pages.
//!
//! # Architecture
//!
//! - [`StorySession`] accepts intents and exposes read-only snapshots
//! - [`BatchOrchestrator`] runs one batch of pages strictly in order
//! - [`PageReservations`] stops two batches from claiming the same page
//! - [`CancellationRegistry`] holds the session, generation, batch and
//!   stage tokens, plus the commit gate every mutation passes through
//! - [`NarrativeStore`] applies [`NarrativeEvent`]s and publishes snapshots
//!
//! # Example
//!
//! ```rust,ignore
//! use folio_engine::{LaunchRequest, StorySession};
//! use folio_retry::FolioConfig;
//!
//! # async fn example(provider: impl folio_interface::StoryProvider + 'static, hero: folio_core::Persona) -> folio_error::FolioResult<()> {
//! let session = StorySession::new(provider, FolioConfig::load()?);
//! session.launch(LaunchRequest::new(hero)).await?;
//!
//! let mut updates = session.subscribe();
//! updates.changed().await.ok();
//! println!("{} pages", updates.borrow().pages.len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod beats;
mod cancellation;
mod continuity;
mod extraction;
mod layout;
mod orchestrator;
mod progress;
mod reservations;
mod session;
mod store;
mod timers;

pub use beats::{
    CONTINUATION_MARKER, NEUTRAL_CHOICES, back_cover_beat, cover_beat, fallback_beat,
    normalize_beat,
};
pub use cancellation::CancellationRegistry;
pub use continuity::{Continuity, ContinuityBuilder};
pub use extraction::{extract_json, parse_beat};
pub use layout::PageLayout;
pub use orchestrator::{BatchOrchestrator, BatchOutcome, BatchRequest};
pub use progress::ProgressReporter;
pub use reservations::{PageReservations, ReservedPages};
pub use session::{LaunchRequest, StorySession};
pub use store::{
    NarrativeEvent, NarrativeSnapshot, NarrativeStore, SessionError, SessionErrorKind,
    SessionStatus,
};
pub use timers::PendingTimers;
