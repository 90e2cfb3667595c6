//! End-to-end: library, configuration and a full reading session.

use async_trait::async_trait;
use folio::{
    Beat, BeatRequest, FileSystemLibrary, FolioConfig, ImageRef, ImageRequest, LaunchRequest,
    LibraryStore, Persona, ProviderResult, SessionStatus, StoryConfig, StoryProvider,
    StorySession, World, parse_beat,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Answers like a chat model that wraps its JSON in prose.
struct ChattyProvider;

#[async_trait]
impl StoryProvider for ChattyProvider {
    async fn generate_persona(
        &self,
        description: &str,
        _genre: &str,
        _cancel: CancellationToken,
    ) -> ProviderResult<Persona> {
        Ok(Persona::new("Wren", description, "art://wren"))
    }

    async fn generate_beat(
        &self,
        request: &BeatRequest,
        _cancel: CancellationToken,
    ) -> ProviderResult<Beat> {
        let focus = if request.page_number == 2 { "coStar" } else { "hero" };
        parse_beat(&format!(
            "Sure! {{\"caption\": \"Chapter {}\", \"scene\": \"{} on the cliffs\", \"focus_character\": \"{}\", \"choices\": [\"Climb\", \"Wait\"]}} Hope that helps.",
            request.page_number, request.hero.name, focus
        ))
    }

    async fn generate_image(
        &self,
        request: &ImageRequest,
        _cancel: CancellationToken,
    ) -> ProviderResult<ImageRef> {
        Ok(ImageRef::new(format!("art://panel/{}", request.page_index)))
    }

    fn provider_name(&self) -> &'static str {
        "chatty"
    }
}

fn write_config(dir: &std::path::Path) -> FolioConfig {
    let path = dir.join("folio.toml");
    std::fs::write(
        &path,
        r#"
[layout]
max_story_pages = 4
decision_pages = [3]
initial_pages = 2
batch_size = 2

[timing]
progress_grace_ms = 5
launch_transition_ms = 5

[retry]
base_delay_ms = 1
jitter = false
"#,
    )
    .unwrap();
    FolioConfig::from_file(&path).unwrap()
}

#[tokio::test]
async fn test_story_from_saved_cast() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    assert_eq!(*config.layout.max_story_pages(), 4);

    let library = FileSystemLibrary::new(dir.path().join("library")).unwrap();
    let hero = library
        .save_persona(&Persona::new(" Ada ", "Lighthouse keeper", "art://ada"))
        .await
        .unwrap();
    let world = library
        .save_world(
            &World::new("Saltmarsh", "A drowned town").with_persona_ids(vec![hero.id.clone()]),
        )
        .await
        .unwrap();

    let hero = library.load_persona(&hero.id).await.unwrap();
    let world = library.load_world(&world.id).await.unwrap();
    let settings = StoryConfig::builder()
        .genre("Mystery")
        .opening_prompt("Open on the night the lamp went out")
        .build()
        .unwrap();

    let session = StorySession::new(ChattyProvider, config);
    let mut updates = session.subscribe();
    session
        .launch(
            LaunchRequest::new(hero)
                .with_world(world)
                .with_config(settings),
        )
        .await
        .unwrap();

    let snapshot = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let snapshot = updates.borrow_and_update().clone();
            if snapshot.status == SessionStatus::Reading
                && snapshot.max_generated_page() == 2
                && snapshot.progress.is_none()
            {
                return snapshot;
            }
            updates.changed().await.unwrap();
        }
    })
    .await
    .expect("initial pages never finished");

    let cover = snapshot.page(0).unwrap();
    assert_eq!(
        cover.narrative.as_ref().and_then(|b| b.caption.as_deref()),
        Some("Ada of Saltmarsh")
    );
    assert_eq!(snapshot.co_star.as_ref().map(|p| p.name.as_str()), Some("Wren"));
    assert!(snapshot.page(1).unwrap().choices.is_empty());

    session.continue_story("").await.unwrap();
    let snapshot = session.snapshot();
    let decision = snapshot.page(3).unwrap();
    assert_eq!(decision.choices, vec!["Climb", "Wait"]);
    let last = snapshot.page(4).unwrap();
    assert!(
        last.narrative
            .as_ref()
            .and_then(|b| b.caption.as_deref())
            .unwrap()
            .ends_with(folio::CONTINUATION_MARKER)
    );

    session.resolve_choice(3, "Climb").await.unwrap();
    let snapshot = session.snapshot();
    assert_eq!(snapshot.page(5).unwrap().kind, folio::PageKind::BackCover);
    assert!(snapshot.pages.iter().all(|p| p.is_complete()));
    let indices: Vec<u32> = snapshot.pages.iter().map(|p| p.page_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
}
