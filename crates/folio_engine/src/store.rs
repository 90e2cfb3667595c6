//! Narrative State Store.
//!
//! The session state is an immutable [`NarrativeSnapshot`]. Every change is
//! a [`NarrativeEvent`] folded in by the pure [`NarrativeSnapshot::apply`],
//! and [`NarrativeStore`] publishes each new snapshot over a watch channel.

use folio_core::{Beat, ImageRef, Page, PageKind, Persona, Progress, ProgressStage, StoryConfig, World};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Coarse session state.
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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    /// Choosing cast and settings
    #[default]
    Setup,
    /// Cover in progress
    Generating,
    /// Reader is paging through the book
    Reading,
}

/// Category of a user-visible session error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum SessionErrorKind {
    /// Credential or permission rejected; needs user action
    Credential,
    /// A batch stopped after exhausting retries
    BatchFailed,
}

/// Error flag raised on the session without changing its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionError {
    /// Category
    pub kind: SessionErrorKind,
    /// Human-readable explanation
    pub message: String,
    /// Page that was being generated
    pub page: Option<u32>,
}

/// Every transition the store accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum NarrativeEvent {
    /// Session left setup with its cast and settings
    Launched {
        /// Protagonist
        hero: Persona,
        /// Optional secondary persona
        co_star: Option<Persona>,
        /// Optional setting
        world: Option<World>,
        /// Creative settings
        config: StoryConfig,
    },
    /// Cover could not be produced; back to setup
    LaunchFailed,
    /// Loading placeholders for freshly reserved pages
    PagesReserved(Vec<Page>),
    /// Beat written for a page
    NarrativeAttached {
        /// Page index
        page_index: u32,
        /// Normalized beat
        beat: Beat,
    },
    /// Panel rendered; the page is complete
    ImageAttached {
        /// Page index
        page_index: u32,
        /// Rendered artwork
        image_ref: ImageRef,
    },
    /// Co-star cast mid-pipeline
    CoStarCast(Persona),
    /// Reader picked a branch
    ChoiceResolved {
        /// Page index
        page_index: u32,
        /// Picked choice
        choice: String,
    },
    /// Batch progress changed
    ProgressUpdated(Progress),
    /// Remove progress if it still belongs to this batch
    ProgressCleared {
        /// Batch whose progress should go
        batch_id: u64,
    },
    /// Cover done; show the book
    ReadingStarted,
    /// Raise the error flag
    ErrorRaised(SessionError),
    /// Lower the error flag
    ErrorCleared,
    /// Stop loading these pages and drop partial narrative
    PagesAbandoned(Vec<u32>),
    /// Abandon every loading page
    GenerationAborted,
    /// Back to an empty setup
    SessionReset,
}

/// Read-only view of the session.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NarrativeSnapshot {
    /// Coarse state
    pub status: SessionStatus,
    /// Pages, unique by index, ascending
    pub pages: Vec<Page>,
    /// Protagonist
    pub hero: Option<Persona>,
    /// Secondary persona
    pub co_star: Option<Persona>,
    /// Setting
    pub world: Option<World>,
    /// Creative settings
    pub config: StoryConfig,
    /// Running batch progress
    pub progress: Option<Progress>,
    /// Error flag
    pub error: Option<SessionError>,
    /// Incremented by every applied event
    pub revision: u64,
}

fn abandon(page: &mut Page) {
    if page.is_loading {
        page.is_loading = false;
        page.narrative = None;
        page.image_ref = None;
        page.choices.clear();
    }
}

impl NarrativeSnapshot {
    /// Fold one event into a new snapshot.
    ///
    /// # Examples
    ///
    /// ```
    /// use folio_core::{Page, PageKind};
    /// use folio_engine::{NarrativeEvent, NarrativeSnapshot};
    ///
    /// let snapshot = NarrativeSnapshot::default().apply(&NarrativeEvent::PagesReserved(vec![
    ///     Page::placeholder(2, PageKind::Story, false),
    ///     Page::placeholder(1, PageKind::Story, false),
    /// ]));
    ///
    /// let indices: Vec<_> = snapshot.pages.iter().map(|p| p.page_index).collect();
    /// assert_eq!(indices, vec![1, 2]);
    /// assert_eq!(snapshot.revision, 1);
    /// ```
    pub fn apply(&self, event: &NarrativeEvent) -> NarrativeSnapshot {
        let mut next = self.clone();
        next.revision = self.revision + 1;

        match event {
            NarrativeEvent::Launched {
                hero,
                co_star,
                world,
                config,
            } => {
                next.status = SessionStatus::Generating;
                next.pages.clear();
                next.hero = Some(hero.clone());
                next.co_star = co_star.clone();
                next.world = world.clone();
                next.config = config.clone();
                next.progress = None;
                next.error = None;
            }
            NarrativeEvent::LaunchFailed => {
                next.status = SessionStatus::Setup;
                next.pages.clear();
                next.progress = None;
            }
            NarrativeEvent::PagesReserved(placeholders) => {
                for placeholder in placeholders {
                    match next
                        .pages
                        .binary_search_by_key(&placeholder.page_index, |page| page.page_index)
                    {
                        // Committed pages are never replaced
                        Ok(pos) if next.pages[pos].is_complete() => {}
                        Ok(pos) => next.pages[pos] = placeholder.clone(),
                        Err(pos) => next.pages.insert(pos, placeholder.clone()),
                    }
                }
            }
            NarrativeEvent::NarrativeAttached { page_index, beat } => {
                if let Some(page) = next.page_mut(*page_index) {
                    page.choices = beat.choices.clone();
                    page.narrative = Some(beat.clone());
                }
            }
            NarrativeEvent::ImageAttached {
                page_index,
                image_ref,
            } => {
                if let Some(page) = next.page_mut(*page_index) {
                    page.image_ref = Some(image_ref.clone());
                    page.is_loading = false;
                }
            }
            NarrativeEvent::CoStarCast(persona) => {
                next.co_star = Some(persona.clone());
            }
            NarrativeEvent::ChoiceResolved { page_index, choice } => {
                if let Some(page) = next.page_mut(*page_index) {
                    page.resolved_choice = Some(choice.clone());
                }
            }
            NarrativeEvent::ProgressUpdated(progress) => {
                next.progress = Some(progress.clone());
            }
            NarrativeEvent::ProgressCleared { batch_id } => {
                if next.progress.as_ref().map(|p| p.batch_id) == Some(*batch_id) {
                    next.progress = None;
                }
            }
            NarrativeEvent::ReadingStarted => {
                if next.status == SessionStatus::Generating {
                    next.status = SessionStatus::Reading;
                }
            }
            NarrativeEvent::ErrorRaised(error) => {
                next.error = Some(error.clone());
            }
            NarrativeEvent::ErrorCleared => {
                next.error = None;
            }
            NarrativeEvent::PagesAbandoned(indices) => {
                for page in next
                    .pages
                    .iter_mut()
                    .filter(|page| indices.contains(&page.page_index))
                {
                    abandon(page);
                }
            }
            NarrativeEvent::GenerationAborted => {
                next.pages.iter_mut().for_each(abandon);
                if let Some(progress) = next.progress.as_mut() {
                    if !progress.label.is_terminal() {
                        progress.label = ProgressStage::Aborted;
                    }
                }
            }
            NarrativeEvent::SessionReset => {
                next = NarrativeSnapshot {
                    revision: next.revision,
                    ..NarrativeSnapshot::default()
                };
            }
        }

        next
    }

    fn page_mut(&mut self, page_index: u32) -> Option<&mut Page> {
        self.pages
            .iter_mut()
            .find(|page| page.page_index == page_index)
    }

    /// Page at `page_index`, if any.
    pub fn page(&self, page_index: u32) -> Option<&Page> {
        self.pages.iter().find(|page| page.page_index == page_index)
    }

    /// Highest story page that is fully written, or 0.
    pub fn max_generated_page(&self) -> u32 {
        self.pages
            .iter()
            .filter(|page| page.kind == PageKind::Story && page.is_complete())
            .map(|page| page.page_index)
            .max()
            .unwrap_or(0)
    }

    /// Whether any page is still loading.
    pub fn is_generating(&self) -> bool {
        self.pages.iter().any(|page| page.is_loading)
    }
}

/// Owner of the current snapshot.
///
/// Presentation reads through [`snapshot`](NarrativeStore::snapshot) or a
/// [`subscribe`](NarrativeStore::subscribe) receiver; only the engine
/// dispatches events.
#[derive(Debug)]
pub struct NarrativeStore {
    sender: watch::Sender<NarrativeSnapshot>,
}

impl Default for NarrativeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NarrativeStore {
    /// Create a store holding an empty setup snapshot.
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(NarrativeSnapshot::default());
        Self { sender }
    }

    /// Apply an event and publish the result.
    pub fn dispatch(&self, event: NarrativeEvent) {
        tracing::trace!(?event, "Dispatching narrative event");
        self.sender.send_modify(|snapshot| *snapshot = snapshot.apply(&event));
    }

    /// Apply an event only if `precondition` holds for the current snapshot.
    ///
    /// The check and the update happen atomically. Returns whether the
    /// event was applied.
    pub fn dispatch_if(
        &self,
        precondition: impl FnOnce(&NarrativeSnapshot) -> bool,
        event: NarrativeEvent,
    ) -> bool {
        self.sender.send_if_modified(|snapshot| {
            if !precondition(snapshot) {
                return false;
            }
            *snapshot = snapshot.apply(&event);
            true
        })
    }

    /// Clone of the current snapshot.
    pub fn snapshot(&self) -> NarrativeSnapshot {
        self.sender.borrow().clone()
    }

    /// Receiver notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<NarrativeSnapshot> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use folio_core::FocusCharacter;

    fn hero() -> Persona {
        Persona::new("Mara", "keeper", "art://mara")
    }

    fn launched() -> NarrativeSnapshot {
        NarrativeSnapshot::default().apply(&NarrativeEvent::Launched {
            hero: hero(),
            co_star: None,
            world: None,
            config: StoryConfig::default(),
        })
    }

    fn progress(batch_id: u64) -> Progress {
        Progress {
            batch_id,
            current: 0,
            total: 2,
            label: ProgressStage::WritingBeat,
            substep: None,
            percentage: 0,
            started_at: Utc::now(),
            elapsed_ms: 0,
        }
    }

    #[test]
    fn test_page_lifecycle() {
        let beat = Beat::new("Harbor", FocusCharacter::Hero);
        let snapshot = launched()
            .apply(&NarrativeEvent::PagesReserved(vec![Page::placeholder(
                0,
                PageKind::Cover,
                false,
            )]))
            .apply(&NarrativeEvent::NarrativeAttached {
                page_index: 0,
                beat: beat.clone(),
            });
        assert!(snapshot.pages[0].is_loading);
        assert_eq!(snapshot.pages[0].narrative.as_ref(), Some(&beat));

        let snapshot = snapshot.apply(&NarrativeEvent::ImageAttached {
            page_index: 0,
            image_ref: ImageRef::from("image://0"),
        });
        assert!(snapshot.pages[0].is_complete());
    }

    #[test]
    fn test_reserving_existing_index_replaces_page() {
        let snapshot = launched()
            .apply(&NarrativeEvent::PagesReserved(vec![Page::placeholder(
                3,
                PageKind::Story,
                false,
            )]))
            .apply(&NarrativeEvent::PagesAbandoned(vec![3]))
            .apply(&NarrativeEvent::PagesReserved(vec![Page::placeholder(
                3,
                PageKind::Story,
                false,
            )]));
        assert_eq!(snapshot.pages.len(), 1);
        assert!(snapshot.pages[0].is_loading);
    }

    #[test]
    fn test_reserving_complete_page_keeps_it() {
        let beat = Beat::new("Harbor", FocusCharacter::Hero);
        let snapshot = launched()
            .apply(&NarrativeEvent::PagesReserved(vec![Page::placeholder(
                11,
                PageKind::BackCover,
                false,
            )]))
            .apply(&NarrativeEvent::NarrativeAttached {
                page_index: 11,
                beat: beat.clone(),
            })
            .apply(&NarrativeEvent::ImageAttached {
                page_index: 11,
                image_ref: ImageRef::from("image://11"),
            })
            .apply(&NarrativeEvent::PagesReserved(vec![Page::placeholder(
                11,
                PageKind::BackCover,
                false,
            )]));

        let page = snapshot.page(11).unwrap();
        assert!(page.is_complete());
        assert_eq!(page.narrative.as_ref(), Some(&beat));
        assert_eq!(page.image_ref, Some(ImageRef::from("image://11")));
    }

    #[test]
    fn test_abort_abandons_loading_pages_only() {
        let mut done = Page::placeholder(1, PageKind::Story, false);
        done.narrative = Some(Beat::new("done", FocusCharacter::Hero));
        done.is_loading = false;
        let mut partial = Page::placeholder(2, PageKind::Story, false);
        partial.narrative = Some(Beat::new("half", FocusCharacter::Hero));

        let snapshot = launched()
            .apply(&NarrativeEvent::PagesReserved(vec![done, partial]))
            .apply(&NarrativeEvent::ProgressUpdated(progress(1)))
            .apply(&NarrativeEvent::GenerationAborted);

        assert!(snapshot.pages[0].is_complete());
        assert!(snapshot.pages[1].is_abandoned());
        assert_eq!(snapshot.progress.unwrap().label, ProgressStage::Aborted);
        assert_eq!(snapshot.status, SessionStatus::Generating);
    }

    #[test]
    fn test_progress_clear_matches_batch() {
        let snapshot = launched().apply(&NarrativeEvent::ProgressUpdated(progress(2)));
        let kept = snapshot.apply(&NarrativeEvent::ProgressCleared { batch_id: 1 });
        assert!(kept.progress.is_some());
        let cleared = snapshot.apply(&NarrativeEvent::ProgressCleared { batch_id: 2 });
        assert!(cleared.progress.is_none());
    }

    #[test]
    fn test_error_flag_is_orthogonal_to_status() {
        let snapshot = launched()
            .apply(&NarrativeEvent::ReadingStarted)
            .apply(&NarrativeEvent::ErrorRaised(SessionError {
                kind: SessionErrorKind::BatchFailed,
                message: "offline".to_string(),
                page: Some(3),
            }));
        assert_eq!(snapshot.status, SessionStatus::Reading);
        assert!(snapshot.error.is_some());

        let snapshot = snapshot.apply(&NarrativeEvent::ErrorCleared);
        assert_eq!(snapshot.status, SessionStatus::Reading);
        assert!(snapshot.error.is_none());
    }

    #[test]
    fn test_reading_requires_generating() {
        let snapshot = NarrativeSnapshot::default().apply(&NarrativeEvent::ReadingStarted);
        assert_eq!(snapshot.status, SessionStatus::Setup);
    }

    #[test]
    fn test_reset_keeps_revision_monotonic() {
        let snapshot = launched().apply(&NarrativeEvent::SessionReset);
        assert_eq!(snapshot.status, SessionStatus::Setup);
        assert!(snapshot.hero.is_none());
        assert_eq!(snapshot.revision, 2);
    }

    #[test]
    fn test_max_generated_page_ignores_loading_and_back_cover() {
        let mut story = Page::placeholder(4, PageKind::Story, false);
        story.narrative = Some(Beat::new("four", FocusCharacter::Hero));
        story.is_loading = false;
        let mut back = Page::placeholder(11, PageKind::BackCover, false);
        back.narrative = Some(Beat::new("back", FocusCharacter::Hero));
        back.is_loading = false;

        let snapshot = launched().apply(&NarrativeEvent::PagesReserved(vec![
            story,
            Page::placeholder(5, PageKind::Story, false),
            back,
        ]));
        assert_eq!(snapshot.max_generated_page(), 4);
    }

    #[test]
    fn test_store_dispatch_if() {
        let store = NarrativeStore::new();
        let applied = store.dispatch_if(
            |s| s.status == SessionStatus::Reading,
            NarrativeEvent::ErrorCleared,
        );
        assert!(!applied);
        assert_eq!(store.snapshot().revision, 0);

        store.dispatch(NarrativeEvent::ErrorCleared);
        assert_eq!(store.snapshot().revision, 1);
    }
}
