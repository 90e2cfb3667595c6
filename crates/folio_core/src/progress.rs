//! Progress records streamed to presentation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label for the phase a batch is in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    /// Pages reserved, nothing sent yet
    #[strum(to_string = "Preparing pages")]
    Preparing,
    /// Beat request in flight
    #[strum(to_string = "Writing story")]
    WritingBeat,
    /// Co-star persona request in flight
    #[strum(to_string = "Casting co-star")]
    CastingPersona,
    /// Image request in flight
    #[strum(to_string = "Rendering panel")]
    RenderingImage,
    /// Every reserved page committed
    #[strum(to_string = "Complete")]
    Complete,
    /// Stopped by the reader
    #[strum(to_string = "Aborted")]
    Aborted,
    /// Stopped by an error
    #[strum(to_string = "Failed")]
    Failed,
}

impl ProgressStage {
    /// Whether the batch has stopped.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressStage::Complete | ProgressStage::Aborted | ProgressStage::Failed
        )
    }
}

/// Snapshot of a running batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Batch this progress belongs to
    pub batch_id: u64,
    /// Pages finished
    pub current: u32,
    /// Pages reserved by the batch
    pub total: u32,
    /// Current phase
    pub label: ProgressStage,
    /// Finer detail (e.g. "Page 5")
    pub substep: Option<String>,
    /// Rounded completion percentage
    pub percentage: u8,
    /// When the batch started
    pub started_at: DateTime<Utc>,
    /// Milliseconds since `started_at`
    pub elapsed_ms: u64,
}
