//! Narrative beats: one page's worth of story.

use serde::{Deserialize, Serialize};

/// Which character a beat's panel is framed around.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum FocusCharacter {
    /// The protagonist
    #[default]
    Hero,
    /// The secondary persona, cast lazily if missing
    #[serde(alias = "co_star", alias = "costar")]
    CoStar,
    /// Anyone else (crowds, villains, scenery)
    Other,
}

/// One page's narrative unit.
///
/// The wire form accepts both `focusCharacter` and `focus_character`, so
/// adapters can deserialize model output directly.
///
/// # Examples
///
/// ```
/// use folio_core::{Beat, FocusCharacter};
///
/// let beat: Beat = serde_json::from_str(
///     r#"{"scene": "A lighthouse in a storm", "focusCharacter": "coStar"}"#,
/// ).unwrap();
/// assert_eq!(beat.focus_character, FocusCharacter::CoStar);
/// assert!(beat.choices.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Beat {
    /// Narration box text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Speech balloon text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue: Option<String>,
    /// English scene description for the image model
    pub scene: String,
    /// Character the panel centres on
    #[serde(default, alias = "focus_character")]
    pub focus_character: FocusCharacter,
    /// Branch choices; non-empty only on decision and final pages
    #[serde(default)]
    pub choices: Vec<String>,
}

impl Beat {
    /// Create a beat with only a scene description.
    pub fn new(scene: impl Into<String>, focus_character: FocusCharacter) -> Self {
        Self {
            caption: None,
            dialogue: None,
            scene: scene.into(),
            focus_character,
            choices: Vec::new(),
        }
    }

    /// Builder method to set the caption.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Builder method to set the dialogue.
    pub fn with_dialogue(mut self, dialogue: impl Into<String>) -> Self {
        self.dialogue = Some(dialogue.into());
        self
    }

    /// Builder method to set the choices.
    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }
}
