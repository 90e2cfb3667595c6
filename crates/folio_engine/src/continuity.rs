//! Narrative Continuity Builder.

use folio_core::{FocusCharacter, Page, PageKind, PageSummary};

/// Context handed to the beat generator for one page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Continuity {
    /// Earlier story pages, ascending
    pub history: Vec<PageSummary>,
    /// Soft bias for the next focus character
    pub focus_hint: Option<FocusCharacter>,
    /// Must-honor instruction for this page only
    pub directive: Option<String>,
}

/// Assembles prior-page context for the next beat request.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinuityBuilder;

impl ContinuityBuilder {
    /// Build the continuity for `target`.
    ///
    /// Only story pages before `target` that already carry a narrative are
    /// included. When the previous beat focused the hero and a co-star
    /// exists, the next beat is nudged toward the co-star. Blank guidance is
    /// ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use folio_core::{Beat, FocusCharacter, Page, PageKind};
    /// use folio_engine::ContinuityBuilder;
    ///
    /// let mut page = Page::placeholder(1, PageKind::Story, false);
    /// page.narrative = Some(Beat::new("A quiet harbor", FocusCharacter::Hero));
    /// page.is_loading = false;
    ///
    /// let continuity = ContinuityBuilder::build(&[page], 2, true, Some("  "));
    /// assert_eq!(continuity.history.len(), 1);
    /// assert_eq!(continuity.focus_hint, Some(FocusCharacter::CoStar));
    /// assert_eq!(continuity.directive, None);
    /// ```
    pub fn build(
        pages: &[Page],
        target: u32,
        has_co_star: bool,
        guidance: Option<&str>,
    ) -> Continuity {
        let mut history: Vec<PageSummary> = pages
            .iter()
            .filter(|page| page.kind == PageKind::Story && page.page_index < target)
            .filter_map(PageSummary::from_page)
            .collect();
        history.sort_by_key(|summary| summary.page_index);

        let focus_hint = match history.last() {
            Some(previous) if previous.focus == FocusCharacter::Hero && has_co_star => {
                Some(FocusCharacter::CoStar)
            }
            _ => None,
        };

        let directive = guidance
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);

        Continuity {
            history,
            focus_hint,
            directive,
        }
    }
}
