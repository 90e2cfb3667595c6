//! Pages (comic faces) and their continuity summaries.

use crate::{Beat, FocusCharacter, ImageRef};
use serde::{Deserialize, Serialize};

/// Role of a page in the book.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PageKind {
    /// Page 0
    Cover,
    /// Pages 1 through the last story page
    Story,
    /// The page after the last story page
    BackCover,
}

/// A single page held by the narrative store.
///
/// Created as a loading placeholder when its page number is reserved, then
/// mutated twice: narrative attached, then image attached with
/// `is_loading = false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Unique page identifier
    pub id: String,
    /// Position in the book (0 = cover)
    pub page_index: u32,
    /// Cover, story or back cover
    pub kind: PageKind,
    /// Rendered artwork, once available
    pub image_ref: Option<ImageRef>,
    /// Narrative beat, once written
    pub narrative: Option<Beat>,
    /// Branch choices offered to the reader
    pub choices: Vec<String>,
    /// Choice the reader picked, if any
    pub resolved_choice: Option<String>,
    /// True while the page pipeline is running
    pub is_loading: bool,
    /// Whether this page must offer a branching choice
    pub is_decision_page: bool,
}

impl Page {
    /// Create a loading placeholder for a freshly reserved page.
    ///
    /// # Examples
    ///
    /// ```
    /// use folio_core::{Page, PageKind};
    ///
    /// let page = Page::placeholder(0, PageKind::Cover, false);
    /// assert!(page.is_loading);
    /// assert!(page.narrative.is_none());
    /// ```
    pub fn placeholder(page_index: u32, kind: PageKind, is_decision_page: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            page_index,
            kind,
            image_ref: None,
            narrative: None,
            choices: Vec::new(),
            resolved_choice: None,
            is_loading: true,
            is_decision_page,
        }
    }

    /// Narrative written and artwork committed.
    pub fn is_complete(&self) -> bool {
        !self.is_loading && self.narrative.is_some()
    }

    /// Pipeline stopped before a narrative was committed.
    pub fn is_abandoned(&self) -> bool {
        !self.is_loading && self.narrative.is_none()
    }
}

/// Compact per-page record handed to the beat generator as history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    /// Page position
    pub page_index: u32,
    /// Narration text
    pub caption: Option<String>,
    /// Spoken text
    pub dialogue: Option<String>,
    /// Visual description
    pub scene: String,
    /// Focus of the panel
    pub focus: FocusCharacter,
    /// Branch the reader picked on this page
    pub resolved_choice: Option<String>,
}

impl PageSummary {
    /// Summarise a page, or `None` when it has no narrative yet.
    pub fn from_page(page: &Page) -> Option<Self> {
        let beat = page.narrative.as_ref()?;
        Some(Self {
            page_index: page.page_index,
            caption: beat.caption.clone(),
            dialogue: beat.dialogue.clone(),
            scene: beat.scene.clone(),
            focus: beat.focus_character,
            resolved_choice: page.resolved_choice.clone(),
        })
    }
}
