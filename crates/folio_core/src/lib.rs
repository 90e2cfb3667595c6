//! Core data types for the Folio narrative generation engine.
//!
//! This crate provides the data model shared by every Folio crate: pages and
//! their beats, the cast (personas and worlds), the story configuration and
//! the progress records streamed to presentation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod beat;
mod image;
mod page;
mod persona;
mod progress;
mod stage;
mod story;
mod telemetry;

pub use beat::{Beat, FocusCharacter};
pub use image::ImageRef;
pub use page::{Page, PageKind, PageSummary};
pub use persona::{MAX_WORLD_IMAGES, Persona, World};
pub use progress::{Progress, ProgressStage};
pub use stage::Stage;
pub use story::{GenerationPreset, StoryConfig, StoryConfigBuilder};
pub use telemetry::{init_telemetry, shutdown_telemetry};
