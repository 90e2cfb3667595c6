//! Collaborator traits for the Folio narrative generation engine.
//!
//! The engine talks to two outside services: an AI provider that writes
//! beats, casts personas and renders panels ([`StoryProvider`]), and a
//! library that persists the cast and saved presets ([`LibraryStore`]).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod library;
mod provider;
mod request;

pub use library::LibraryStore;
pub use provider::StoryProvider;
pub use request::{BeatRequest, ImageRequest};
