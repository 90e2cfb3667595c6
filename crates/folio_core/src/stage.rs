//! Remote pipeline stages.

use serde::{Deserialize, Serialize};

/// A remote call made while producing a page.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    /// Narrative beat generation
    Beat,
    /// Co-star casting
    Persona,
    /// Panel rendering
    Image,
}
