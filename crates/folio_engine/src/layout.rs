//! Page numbering of a book.

use derive_getters::Getters;
use folio_core::PageKind;
use folio_retry::LayoutConfig;

/// Where each page sits in the book and which pages branch.
///
/// Page 0 is the cover, pages `1..=max_story_pages` tell the story and the
/// page after the last story page is the back cover.
///
/// # Examples
///
/// ```
/// use folio_core::PageKind;
/// use folio_engine::PageLayout;
///
/// let layout = PageLayout::default();
/// assert_eq!(layout.kind_of(0), PageKind::Cover);
/// assert_eq!(layout.kind_of(10), PageKind::Story);
/// assert_eq!(layout.back_cover_index(), 11);
/// assert_eq!(layout.window(10, 5), vec![10, 11]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct PageLayout {
    max_story_pages: u32,
    decision_pages: Vec<u32>,
    initial_pages: u32,
    batch_size: u32,
}

impl PageLayout {
    /// Build a layout from the `[layout]` section.
    pub fn from_config(config: &LayoutConfig) -> Self {
        Self {
            max_story_pages: *config.max_story_pages(),
            decision_pages: config.decision_pages().clone(),
            initial_pages: *config.initial_pages(),
            batch_size: *config.batch_size(),
        }
    }

    /// Role of the page at `index`.
    pub fn kind_of(&self, index: u32) -> PageKind {
        if index == 0 {
            PageKind::Cover
        } else if index <= self.max_story_pages {
            PageKind::Story
        } else {
            PageKind::BackCover
        }
    }

    /// Whether the page must offer a branching choice.
    pub fn is_decision(&self, index: u32) -> bool {
        self.kind_of(index) == PageKind::Story && self.decision_pages.contains(&index)
    }

    /// Whether the page is the last story page.
    pub fn is_final(&self, index: u32) -> bool {
        index == self.max_story_pages
    }

    /// Index of the back cover.
    pub fn back_cover_index(&self) -> u32 {
        self.max_story_pages + 1
    }

    /// Page numbers `[start, start + count)` clipped to the book.
    pub fn window(&self, start: u32, count: u32) -> Vec<u32> {
        let last = self.back_cover_index();
        if start > last {
            return Vec::new();
        }
        let end = start.saturating_add(count).min(last + 1);
        (start..end).collect()
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::from_config(&LayoutConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_and_final_pages() {
        let layout = PageLayout::default();
        assert!(layout.is_decision(5));
        assert!(!layout.is_decision(4));
        assert!(layout.is_final(10));
        assert!(!layout.is_final(11));
    }

    #[test]
    fn test_window_clips_to_book() {
        let layout = PageLayout::default();
        assert_eq!(layout.window(1, 2), vec![1, 2]);
        assert_eq!(layout.window(11, 2), vec![11]);
        assert!(layout.window(12, 2).is_empty());
        assert!(layout.window(3, 0).is_empty());
        assert_eq!(layout.window(u32::MAX, 2), Vec::<u32>::new());
    }

    #[test]
    fn test_custom_layout() {
        let config = LayoutConfig::default()
            .with_max_story_pages(4)
            .with_decision_pages(vec![2, 4]);
        let layout = PageLayout::from_config(&config);
        assert_eq!(layout.kind_of(5), PageKind::BackCover);
        assert!(layout.is_decision(4));
        assert!(layout.is_final(4));
    }
}
