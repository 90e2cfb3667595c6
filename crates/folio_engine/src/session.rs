//! Reader-facing session: intents in, snapshots out.

use crate::{
    BatchOrchestrator, BatchOutcome, BatchRequest, NarrativeEvent, NarrativeSnapshot,
    SessionStatus,
};
use derive_setters::Setters;
use folio_core::{Persona, StoryConfig, World};
use folio_error::{EngineError, EngineErrorKind, FolioResult};
use folio_interface::StoryProvider;
use folio_retry::FolioConfig;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Cast and settings for a new story.
#[derive(Debug, Clone, PartialEq, Setters)]
#[setters(prefix = "with_", strip_option, into)]
pub struct LaunchRequest {
    /// Protagonist
    pub hero: Persona,
    /// Optional secondary persona
    pub co_star: Option<Persona>,
    /// Optional setting
    pub world: Option<World>,
    /// Creative settings
    pub config: StoryConfig,
}

impl LaunchRequest {
    /// Launch `hero` with default settings and no co-star or world.
    pub fn new(hero: Persona) -> Self {
        Self {
            hero,
            co_star: None,
            world: None,
            config: StoryConfig::default(),
        }
    }
}

/// One reading session over a [`StoryProvider`].
///
/// Every intent method is safe to call from any task. Presentation
/// observes state through [`snapshot`](Self::snapshot) and
/// [`subscribe`](Self::subscribe); it never mutates it directly.
///
/// Dropping the session aborts any in-flight generation.
pub struct StorySession<P: StoryProvider + 'static> {
    orchestrator: Arc<BatchOrchestrator<P>>,
}

impl<P: StoryProvider + 'static> StorySession<P> {
    /// Create a session in setup.
    pub fn new(provider: P, config: FolioConfig) -> Self {
        tracing::info!(provider = provider.provider_name(), "Creating StorySession");
        Self {
            orchestrator: Arc::new(BatchOrchestrator::new(provider, &config)),
        }
    }

    /// The orchestrator driving this session.
    pub fn orchestrator(&self) -> &Arc<BatchOrchestrator<P>> {
        &self.orchestrator
    }

    /// Current state.
    pub fn snapshot(&self) -> NarrativeSnapshot {
        self.orchestrator.store().snapshot()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<NarrativeSnapshot> {
        self.orchestrator.store().subscribe()
    }

    fn invalid_transition(intent: &str, status: SessionStatus) -> EngineError {
        EngineError::new(EngineErrorKind::InvalidTransition {
            intent: intent.to_string(),
            status: status.to_string(),
        })
    }

    /// Leave setup, generate the cover and, after a short transition,
    /// start reading while the first story pages generate in the background.
    ///
    /// Returns the outcome of the cover batch. If the cover fails or is
    /// cancelled the session goes back to setup.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` outside setup, or the cover batch error.
    #[tracing::instrument(skip(self, request), fields(hero = %request.hero.name))]
    pub async fn launch(&self, request: LaunchRequest) -> FolioResult<BatchOutcome> {
        let cancellations = self.orchestrator.cancellations();
        let session = cancellations.session_token();
        let generation = cancellations.generation_token();

        let LaunchRequest {
            hero,
            co_star,
            world,
            config,
        } = request;
        let launched = self.orchestrator.store().dispatch_if(
            |snapshot| snapshot.status == SessionStatus::Setup,
            NarrativeEvent::Launched {
                hero: hero.clone(),
                co_star: co_star.clone(),
                world: world.clone(),
                config: config.clone(),
            },
        );
        if !launched {
            return Err(Self::invalid_transition("launch", self.snapshot().status).into());
        }

        let cover = BatchRequest {
            start_page: 0,
            count: 1,
            history: Vec::new(),
            hero: hero.clone(),
            co_star,
            config: config.clone(),
            world: world.clone(),
            guidance: None,
        };

        match self.orchestrator.generate_batch_under(&generation, cover).await {
            Ok(outcome @ BatchOutcome::Completed { .. }) => {
                self.schedule_reading(session, generation, hero, world, config);
                Ok(outcome)
            }
            Ok(outcome) => {
                tracing::info!(?outcome, "Cover did not complete, returning to setup");
                self.orchestrator
                    .dispatch_if_live(&session, vec![NarrativeEvent::LaunchFailed]);
                Ok(outcome)
            }
            Err(err) => {
                tracing::error!(error = %err, "Cover failed, returning to setup");
                self.orchestrator
                    .dispatch_if_live(&session, vec![NarrativeEvent::LaunchFailed]);
                Err(err)
            }
        }
    }

    /// After the transition delay: start reading, then the initial batch.
    fn schedule_reading(
        &self,
        session: CancellationToken,
        generation: CancellationToken,
        hero: Persona,
        world: Option<World>,
        config: StoryConfig,
    ) {
        let orchestrator = self.orchestrator.clone();
        let delay = orchestrator.timing().launch_transition();

        self.orchestrator.timers().schedule(delay, async move {
            if !orchestrator.dispatch_if_live(&session, vec![NarrativeEvent::ReadingStarted]) {
                tracing::debug!("Session reset during launch transition");
                return;
            }
            if generation.is_cancelled() {
                tracing::info!("Generation aborted during launch transition, not starting pages");
                return;
            }

            let snapshot = orchestrator.store().snapshot();
            let request = BatchRequest {
                start_page: 1,
                count: *orchestrator.layout().initial_pages(),
                history: snapshot.pages,
                hero,
                co_star: snapshot.co_star,
                guidance: Some(config.opening_prompt().clone()),
                config,
                world,
            };

            tokio::spawn(async move {
                if let Err(err) = orchestrator.generate_batch_under(&generation, request).await {
                    tracing::warn!(error = %err, "Initial batch failed");
                }
            });
        });
    }

    /// Generate the next window of pages steered by director guidance.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` in setup, or the batch error.
    #[tracing::instrument(skip(self, guidance))]
    pub async fn continue_story(&self, guidance: impl Into<String>) -> FolioResult<BatchOutcome> {
        let guidance = guidance.into();
        let generation = self.orchestrator.cancellations().generation_token();
        let snapshot = self.snapshot();
        if snapshot.status == SessionStatus::Setup {
            return Err(Self::invalid_transition("continue", snapshot.status).into());
        }

        self.next_window(&generation, snapshot, Some(guidance)).await
    }

    /// Record the reader's pick on a decision page and generate the branch.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` in setup, `PageNotFound` for an unknown
    /// page, `InvalidChoice` for a choice the page does not offer, or the
    /// batch error.
    #[tracing::instrument(skip(self, choice))]
    pub async fn resolve_choice(
        &self,
        page_index: u32,
        choice: impl Into<String>,
    ) -> FolioResult<BatchOutcome> {
        let choice = choice.into();
        let generation = self.orchestrator.cancellations().generation_token();
        let snapshot = self.snapshot();
        if snapshot.status == SessionStatus::Setup {
            return Err(Self::invalid_transition("resolve_choice", snapshot.status).into());
        }

        let page = snapshot
            .page(page_index)
            .ok_or_else(|| EngineError::new(EngineErrorKind::PageNotFound(page_index)))?;
        if !page.choices.contains(&choice) {
            return Err(EngineError::new(EngineErrorKind::InvalidChoice {
                page: page_index,
                choice,
            })
            .into());
        }

        tracing::info!(page = page_index, %choice, "Choice resolved");
        self.orchestrator.store().dispatch(NarrativeEvent::ChoiceResolved {
            page_index,
            choice: choice.clone(),
        });

        let snapshot = self.snapshot();
        self.next_window(&generation, snapshot, Some(format!("user chose: {}", choice)))
            .await
    }

    async fn next_window(
        &self,
        generation: &CancellationToken,
        snapshot: NarrativeSnapshot,
        guidance: Option<String>,
    ) -> FolioResult<BatchOutcome> {
        let start_page = snapshot.max_generated_page() + 1;
        let Some(hero) = snapshot.hero else {
            return Err(Self::invalid_transition("continue", snapshot.status).into());
        };

        let request = BatchRequest {
            start_page,
            count: *self.orchestrator.layout().batch_size(),
            history: snapshot.pages,
            hero,
            co_star: snapshot.co_star,
            config: snapshot.config,
            world: snapshot.world,
            guidance,
        };
        self.orchestrator
            .generate_batch_under(generation, request)
            .await
    }

    /// Cancel everything in flight. Completed pages and status are kept.
    pub fn abort(&self) -> usize {
        self.orchestrator.abort("user abort")
    }

    /// Throw the story away and return to setup.
    pub fn reset(&self) {
        self.orchestrator.reset();
    }

    /// Abort everything and drop pending timers.
    pub fn shutdown(&self) {
        self.orchestrator.shutdown();
    }
}

impl<P: StoryProvider + 'static> Drop for StorySession<P> {
    fn drop(&mut self) {
        self.orchestrator.shutdown();
    }
}
