//! Request payloads handed to the AI provider.

use folio_core::{Beat, FocusCharacter, PageKind, PageSummary, Persona, StoryConfig, World};
use serde::{Deserialize, Serialize};

/// Everything a provider needs to write the beat for one page.
///
/// # Examples
///
/// ```
/// use folio_core::{Persona, StoryConfig};
/// use folio_interface::BeatRequest;
///
/// let hero = Persona::new("Mara", "A lighthouse keeper", "art://mara");
/// let request = BeatRequest::new(3, StoryConfig::default(), hero)
///     .with_guidance(Some("a storm rolls in".to_string()));
///
/// assert_eq!(request.page_number, 3);
/// assert!(request.history.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatRequest {
    /// Ordered summaries of earlier story pages
    pub history: Vec<PageSummary>,
    /// Page being written
    pub page_number: u32,
    /// The beat must offer at least two choices
    pub is_decision: bool,
    /// Last story page before the back cover
    pub is_final: bool,
    /// Creative settings
    pub config: StoryConfig,
    /// Protagonist
    pub hero: Persona,
    /// Secondary persona, if cast
    pub co_star: Option<Persona>,
    /// Setting, if chosen
    pub world: Option<World>,
    /// Must-honor directive (director input or a resolved choice)
    pub guidance: Option<String>,
    /// Soft bias toward a focus character
    pub focus_hint: Option<FocusCharacter>,
}

impl BeatRequest {
    /// Create a request with empty history and no directives.
    pub fn new(page_number: u32, config: StoryConfig, hero: Persona) -> Self {
        Self {
            history: Vec::new(),
            page_number,
            is_decision: false,
            is_final: false,
            config,
            hero,
            co_star: None,
            world: None,
            guidance: None,
            focus_hint: None,
        }
    }

    /// Builder method to set the must-honor directive.
    pub fn with_guidance(mut self, guidance: Option<String>) -> Self {
        self.guidance = guidance;
        self
    }
}

/// Everything a provider needs to render one panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRequest {
    /// Page being rendered
    pub page_index: u32,
    /// Beat the panel illustrates
    pub beat: Beat,
    /// Cover, story or back cover
    pub page_kind: PageKind,
    /// Creative settings
    pub config: StoryConfig,
    /// Protagonist reference art
    pub hero: Persona,
    /// Secondary persona reference art
    pub co_star: Option<Persona>,
    /// Setting reference art
    pub world: Option<World>,
}
