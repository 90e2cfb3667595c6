//! Story configuration and saved generation presets.

use serde::{Deserialize, Serialize};

/// Creative settings for one story.
///
/// # Examples
///
/// ```
/// use folio_core::StoryConfig;
///
/// let config = StoryConfig::builder()
///     .genre("Noir")
///     .opening_prompt("Rain on neon streets")
///     .build()
///     .unwrap();
///
/// assert_eq!(config.genre(), "Noir");
/// assert_eq!(config.language(), "en-US");
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[builder(default, setter(into))]
#[serde(default)]
pub struct StoryConfig {
    /// Genre (e.g. "Fantasy", "Noir")
    genre: String,
    /// Tone (e.g. "Whimsical", "Grim")
    tone: String,
    /// Output language for captions and dialogue
    language: String,
    /// Free-form premise supplied by the user
    custom_premise: String,
    /// Instruction used as guidance for the first story batch
    opening_prompt: String,
    /// Longer captions and denser dialogue
    rich_mode: bool,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            genre: "Adventure".to_string(),
            tone: "Heroic".to_string(),
            language: "en-US".to_string(),
            custom_premise: String::new(),
            opening_prompt: String::new(),
            rich_mode: false,
        }
    }
}

impl StoryConfig {
    /// Creates a new story config builder.
    pub fn builder() -> StoryConfigBuilder {
        StoryConfigBuilder::default()
    }
}

/// A named, saved story configuration with optional cast links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationPreset {
    /// Stable identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Saved settings
    pub config: StoryConfig,
    /// Saved hero persona
    #[serde(default)]
    pub hero_id: Option<String>,
    /// Saved world
    #[serde(default)]
    pub world_id: Option<String>,
}

impl GenerationPreset {
    /// Create a preset with a fresh identifier.
    pub fn new(name: impl Into<String>, config: StoryConfig) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            config,
            hero_id: None,
            world_id: None,
        }
    }
}
