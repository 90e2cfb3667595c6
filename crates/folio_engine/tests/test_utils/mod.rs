//! Test utilities for engine tests.
//!
//! This module provides a scriptable provider and config helpers.

#![allow(dead_code)]

pub mod mock_provider;

#[allow(unused_imports)]
pub use mock_provider::{Gate, MockProvider, MockResponse};

use folio_core::{ImageRef, Page, PageKind, Persona};
use folio_engine::{NarrativeSnapshot, SessionStatus, StorySession};
use folio_retry::{FolioConfig, RetryConfig, TimingConfig};
use std::time::Duration;

/// Config with near-instant delays and no jitter.
pub fn fast_config() -> FolioConfig {
    let mut config = FolioConfig::default();
    config.timing = TimingConfig::default()
        .with_progress_grace_ms(5)
        .with_launch_transition_ms(5);
    config.retry = RetryConfig::default()
        .with_max_retries(2)
        .with_base_delay_ms(1)
        .with_max_delay_ms(2)
        .with_jitter(false);
    config
}

/// A hero with reference art.
pub fn hero() -> Persona {
    Persona::new("Ada", "A lighthouse keeper with a brass spyglass", ImageRef::new("img://ada"))
}

/// A co-star with reference art.
pub fn co_star() -> Persona {
    Persona::new("Bram", "A smuggler with a conscience", ImageRef::new("img://bram"))
}

/// A completed story page, as the store would hold it.
pub fn written_page(page_index: u32, scene: &str) -> Page {
    let mut page = Page::placeholder(page_index, PageKind::Story, false);
    page.narrative = Some(folio_core::Beat::new(scene, folio_core::FocusCharacter::Hero));
    page.image_ref = Some(ImageRef::new(format!("img://page-{}", page_index)));
    page.is_loading = false;
    page
}

/// Poll the session until `predicate` holds or two seconds pass.
pub async fn wait_for<P, F>(session: &StorySession<P>, predicate: F) -> NarrativeSnapshot
where
    P: folio_interface::StoryProvider + 'static,
    F: Fn(&NarrativeSnapshot) -> bool,
{
    let mut updates = session.subscribe();
    let waited = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let snapshot = updates.borrow_and_update().clone();
            if predicate(&snapshot) {
                return snapshot;
            }
            if updates.changed().await.is_err() {
                return snapshot;
            }
        }
    })
    .await;
    match waited {
        Ok(snapshot) => snapshot,
        Err(_) => panic!("Timed out waiting; last snapshot: {:#?}", session.snapshot()),
    }
}

/// Whether pages `indices` are all present and complete.
pub fn all_complete(snapshot: &NarrativeSnapshot, indices: &[u32]) -> bool {
    indices
        .iter()
        .all(|index| snapshot.page(*index).is_some_and(Page::is_complete))
}

/// Launch and wait for the initial pages to finish.
pub async fn launched_session(provider: MockProvider) -> StorySession<MockProvider> {
    let session = StorySession::new(provider, fast_config());
    session
        .launch(folio_engine::LaunchRequest::new(hero()))
        .await
        .expect("launch failed");
    wait_for(&session, |s| {
        s.status == SessionStatus::Reading && all_complete(s, &[0, 1, 2]) && s.progress.is_none()
    })
    .await;
    session
}
