//! Batch Orchestrator: the per-page generation loop.

use crate::{
    CancellationRegistry, ContinuityBuilder, NarrativeEvent, NarrativeStore, PageLayout,
    PageReservations, PendingTimers, ProgressReporter, ReservedPages, SessionError,
    SessionErrorKind, back_cover_beat, cover_beat, fallback_beat, normalize_beat,
};
use chrono::{DateTime, Utc};
use folio_cache::{BeatCache, BeatKey};
use folio_core::{
    Beat, FocusCharacter, ImageRef, Page, PageKind, Persona, ProgressStage, Stage, StoryConfig,
    World,
};
use folio_error::{EngineError, EngineErrorKind, FolioResult, ProviderError, ProviderResult};
use folio_interface::{BeatRequest, ImageRequest, StoryProvider};
use folio_retry::{FolioConfig, StageGuard, TimingConfig};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

/// Input for one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    /// First page of the window
    pub start_page: u32,
    /// Window length
    pub count: u32,
    /// Pages known when the batch was requested
    pub history: Vec<Page>,
    /// Protagonist
    pub hero: Persona,
    /// Secondary persona, if already cast
    pub co_star: Option<Persona>,
    /// Creative settings
    pub config: StoryConfig,
    /// Setting
    pub world: Option<World>,
    /// Must-honor instruction for the first page of the batch
    pub guidance: Option<String>,
}

/// How a batch ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every requested page was already in flight, complete or out of range
    Skipped,
    /// Every reserved page was committed
    Completed {
        /// Batch identifier
        batch_id: u64,
        /// Pages committed, ascending
        pages: Vec<u32>,
    },
    /// Cancellation stopped the batch
    Aborted {
        /// Batch identifier
        batch_id: u64,
        /// Pages committed before the abort
        completed: Vec<u32>,
    },
}

/// Per-batch values threaded through the page loop.
struct BatchContext<'a> {
    request: &'a BatchRequest,
    batch_id: u64,
    token: CancellationToken,
    started_at: DateTime<Utc>,
    total: u32,
}

/// Runs batches of pages against a [`StoryProvider`].
///
/// Pages inside a batch are generated strictly one after another so each
/// beat sees the pages before it. Separate batches may run concurrently;
/// [`PageReservations`] keeps them off each other's pages.
pub struct BatchOrchestrator<P: StoryProvider> {
    provider: P,
    layout: PageLayout,
    guard: StageGuard,
    timing: TimingConfig,
    store: Arc<NarrativeStore>,
    reservations: PageReservations,
    cancellations: CancellationRegistry,
    timers: PendingTimers,
    cache: Mutex<BeatCache>,
    next_batch_id: AtomicU64,
}

impl<P: StoryProvider> BatchOrchestrator<P> {
    /// Create an orchestrator with its own store and registries.
    pub fn new(provider: P, config: &FolioConfig) -> Self {
        tracing::debug!(
            provider = provider.provider_name(),
            max_story_pages = *config.layout.max_story_pages(),
            "Creating BatchOrchestrator"
        );
        Self {
            provider,
            layout: PageLayout::from_config(&config.layout),
            guard: StageGuard::new(config.retry, config.timeouts),
            timing: config.timing,
            store: Arc::new(NarrativeStore::new()),
            reservations: PageReservations::new(),
            cancellations: CancellationRegistry::new(),
            timers: PendingTimers::new(),
            cache: Mutex::new(BeatCache::new(config.cache.clone())),
            next_batch_id: AtomicU64::new(1),
        }
    }

    /// The provider in use.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Page layout.
    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    /// Session delays.
    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// State store shared with presentation.
    pub fn store(&self) -> &Arc<NarrativeStore> {
        &self.store
    }

    /// Pages currently being generated.
    pub fn reservations(&self) -> &PageReservations {
        &self.reservations
    }

    /// Token hierarchy and commit gate.
    pub fn cancellations(&self) -> &CancellationRegistry {
        &self.cancellations
    }

    /// Delayed work.
    pub fn timers(&self) -> &PendingTimers {
        &self.timers
    }

    fn cache(&self) -> MutexGuard<'_, BeatCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Dispatch events only while `token` is live. Returns whether they landed.
    pub fn dispatch_if_live(&self, token: &CancellationToken, events: Vec<NarrativeEvent>) -> bool {
        self.cancellations
            .commit_if_live(token, || {
                for event in events {
                    self.store.dispatch(event);
                }
            })
            .is_some()
    }

    fn commit(&self, token: &CancellationToken, events: Vec<NarrativeEvent>) -> ProviderResult<()> {
        if self.dispatch_if_live(token, events) {
            Ok(())
        } else {
            Err(ProviderError::cancelled())
        }
    }

    fn report(&self, ctx: &BatchContext<'_>, label: ProgressStage, current: u32, page: Option<u32>) {
        let progress = ProgressReporter::report(
            ctx.batch_id,
            label,
            current,
            ctx.total,
            page.map(|page| format!("Page {}", page)),
            ctx.started_at,
        );
        self.dispatch_if_live(&ctx.token, vec![NarrativeEvent::ProgressUpdated(progress)]);
    }

    /// Clear progress for `batch_id` after the grace delay.
    pub fn schedule_progress_clear(&self, batch_id: u64) {
        let store = self.store.clone();
        self.timers.schedule(self.timing.progress_grace(), async move {
            store.dispatch(NarrativeEvent::ProgressCleared { batch_id });
        });
    }

    /// Generate the pages `[start_page, start_page + count)` that are not already in flight.
    ///
    /// # Errors
    ///
    /// Returns a credential error when the provider rejects the credential
    /// (the whole generation is aborted), or a batch failure when a page
    /// exhausts its retries. Both are also raised on the store.
    pub async fn generate_batch(&self, request: BatchRequest) -> FolioResult<BatchOutcome> {
        // Take the batch token before reserving so an abort in between is seen by the gate
        let token = self.cancellations.begin_batch();
        self.run_batch(token, request).await
    }

    /// Like [`generate_batch`](Self::generate_batch), but bound to a generation
    /// token captured earlier. If that generation has been aborted or reset
    /// since, the batch commits nothing and returns [`BatchOutcome::Aborted`].
    ///
    /// # Errors
    ///
    /// Same as [`generate_batch`](Self::generate_batch).
    pub async fn generate_batch_under(
        &self,
        generation: &CancellationToken,
        request: BatchRequest,
    ) -> FolioResult<BatchOutcome> {
        self.run_batch(generation.child_token(), request).await
    }

    #[tracing::instrument(
        skip(self, token, request),
        fields(start = request.start_page, count = request.count, batch_id = tracing::field::Empty)
    )]
    async fn run_batch(
        &self,
        token: CancellationToken,
        request: BatchRequest,
    ) -> FolioResult<BatchOutcome> {
        let session = self.cancellations.session_token();

        let targets = self.layout.window(request.start_page, request.count);
        let reserved = self.reservations.reserve(&targets);

        // Pages are committed before they are released, so this read sees every finished page
        let snapshot = self.store.snapshot();
        let finished: Vec<u32> = reserved
            .pages()
            .iter()
            .copied()
            .filter(|&index| snapshot.page(index).is_some_and(Page::is_complete))
            .collect();
        let reserved = if finished.is_empty() {
            reserved
        } else {
            self.reservations.release_owned(&reserved, &finished);
            tracing::debug!(finished = ?finished, "Dropped pages that are already complete");
            reserved.without(&finished)
        };

        if reserved.is_empty() {
            tracing::debug!(targets = ?targets, "Nothing to reserve, skipping batch");
            return Ok(BatchOutcome::Skipped);
        }

        let batch_id = self.next_batch_id.fetch_add(1, Ordering::Relaxed);
        tracing::Span::current().record("batch_id", batch_id);
        let ctx = BatchContext {
            request: &request,
            batch_id,
            token,
            started_at: Utc::now(),
            total: reserved.pages().len() as u32,
        };

        let placeholders = reserved
            .pages()
            .iter()
            .map(|&index| {
                Page::placeholder(index, self.layout.kind_of(index), self.layout.is_decision(index))
            })
            .collect();
        let opening = ProgressReporter::report(
            batch_id,
            ProgressStage::Preparing,
            0,
            ctx.total,
            None,
            ctx.started_at,
        );
        if !self.dispatch_if_live(
            &ctx.token,
            vec![
                NarrativeEvent::ErrorCleared,
                NarrativeEvent::PagesReserved(placeholders),
                NarrativeEvent::ProgressUpdated(opening),
            ],
        ) {
            self.reservations.release_owned(&reserved, reserved.pages());
            tracing::debug!("Batch cancelled before it started");
            return Ok(BatchOutcome::Aborted {
                batch_id,
                completed: Vec::new(),
            });
        }

        tracing::info!(pages = ?reserved.pages(), "Batch started");

        let mut history = request.history.clone();
        let mut co_star = request.co_star.clone();
        let mut completed = Vec::with_capacity(reserved.pages().len());

        for (position, &page_index) in reserved.pages().iter().enumerate() {
            // Guidance only steers the first page of the batch
            let guidance = if position == 0 {
                request.guidance.as_deref()
            } else {
                None
            };

            match self
                .generate_page(&ctx, page_index, position as u32, guidance, &history, &mut co_star)
                .await
            {
                Ok(page) => {
                    match history.binary_search_by_key(&page_index, |p| p.page_index) {
                        Ok(pos) => history[pos] = page,
                        Err(pos) => history.insert(pos, page),
                    }
                    completed.push(page_index);
                    self.reservations.release_owned(&reserved, &[page_index]);
                }
                Err(err) => {
                    let remaining = &reserved.pages()[position..];
                    return self.fail_batch(
                        &ctx, &reserved, remaining, completed, page_index, err, &session,
                    );
                }
            }
        }

        self.report(&ctx, ProgressStage::Complete, ctx.total, None);
        self.schedule_progress_clear(batch_id);
        tracing::info!(pages = ?completed, "Batch completed");

        Ok(BatchOutcome::Completed {
            batch_id,
            pages: completed,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn fail_batch(
        &self,
        ctx: &BatchContext<'_>,
        reserved: &ReservedPages,
        remaining: &[u32],
        completed: Vec<u32>,
        page_index: u32,
        err: ProviderError,
        session: &CancellationToken,
    ) -> FolioResult<BatchOutcome> {
        self.reservations.release_owned(reserved, remaining);
        let abandoned = NarrativeEvent::PagesAbandoned(remaining.to_vec());

        if err.kind.is_cancellation() || ctx.token.is_cancelled() {
            // A full abort has already abandoned our pages; a targeted cancel has not
            let progress = ProgressReporter::report(
                ctx.batch_id,
                ProgressStage::Aborted,
                completed.len() as u32,
                ctx.total,
                None,
                ctx.started_at,
            );
            self.dispatch_if_live(
                &ctx.token,
                vec![abandoned, NarrativeEvent::ProgressUpdated(progress)],
            );
            self.schedule_progress_clear(ctx.batch_id);
            tracing::info!(page = page_index, completed = ?completed, "Batch aborted");
            return Ok(BatchOutcome::Aborted {
                batch_id: ctx.batch_id,
                completed,
            });
        }

        let failed = ProgressReporter::report(
            ctx.batch_id,
            ProgressStage::Failed,
            completed.len() as u32,
            ctx.total,
            Some(format!("Page {}", page_index)),
            ctx.started_at,
        );

        if err.kind.is_fatal() {
            tracing::error!(page = page_index, error = %err.kind, "Credential rejected, aborting generation");
            self.abort("credential rejected");
            self.dispatch_if_live(
                session,
                vec![
                    NarrativeEvent::ErrorRaised(SessionError {
                        kind: SessionErrorKind::Credential,
                        message: err.kind.to_string(),
                        page: Some(page_index),
                    }),
                    NarrativeEvent::ProgressUpdated(failed),
                ],
            );
            self.schedule_progress_clear(ctx.batch_id);
            return Err(EngineError::new(EngineErrorKind::Credential(err.kind.to_string())).into());
        }

        tracing::error!(page = page_index, error = %err.kind, "Batch failed");
        self.dispatch_if_live(
            &ctx.token,
            vec![
                abandoned,
                NarrativeEvent::ErrorRaised(SessionError {
                    kind: SessionErrorKind::BatchFailed,
                    message: err.kind.to_string(),
                    page: Some(page_index),
                }),
                NarrativeEvent::ProgressUpdated(failed),
            ],
        );
        self.schedule_progress_clear(ctx.batch_id);
        Err(EngineError::new(EngineErrorKind::BatchFailed {
            page: page_index,
            message: err.kind.to_string(),
        })
        .into())
    }

    /// Continuity, beat, optional co-star, image, commit.
    #[tracing::instrument(skip_all, fields(page = page_index))]
    async fn generate_page(
        &self,
        ctx: &BatchContext<'_>,
        page_index: u32,
        position: u32,
        guidance: Option<&str>,
        history: &[Page],
        co_star: &mut Option<Persona>,
    ) -> ProviderResult<Page> {
        let request = ctx.request;
        let kind = self.layout.kind_of(page_index);
        let is_decision = self.layout.is_decision(page_index);
        let is_final = self.layout.is_final(page_index);

        // Another batch may have cast the co-star since this one started
        if co_star.is_none() {
            *co_star = self.store.snapshot().co_star;
        }

        self.report(ctx, ProgressStage::WritingBeat, position, Some(page_index));
        let beat = match kind {
            PageKind::Cover => {
                cover_beat(&request.config, &request.hero, co_star.as_ref(), request.world.as_ref())
            }
            PageKind::BackCover => back_cover_beat(&request.config, &request.hero),
            PageKind::Story => {
                let continuity =
                    ContinuityBuilder::build(history, page_index, co_star.is_some(), guidance);
                let beat_request = BeatRequest {
                    history: continuity.history,
                    page_number: page_index,
                    is_decision,
                    is_final,
                    config: request.config.clone(),
                    hero: request.hero.clone(),
                    co_star: co_star.clone(),
                    world: request.world.clone(),
                    guidance: continuity.directive,
                    focus_hint: continuity.focus_hint,
                };
                self.story_beat(&ctx.token, &beat_request).await?
            }
        };
        let mut beat = normalize_beat(beat, is_decision, is_final);

        if beat.focus_character == FocusCharacter::CoStar && co_star.is_none() {
            self.report(ctx, ProgressStage::CastingPersona, position, Some(page_index));
            match self.cast_co_star(&ctx.token, page_index, request, &beat).await {
                Ok(persona) => {
                    self.commit(&ctx.token, vec![NarrativeEvent::CoStarCast(persona.clone())])?;
                    tracing::info!(co_star = %persona.name, "Cast co-star");
                    *co_star = Some(persona);
                }
                Err(err) if err.kind.is_cancellation() || err.kind.is_fatal() => return Err(err),
                Err(err) => {
                    tracing::warn!(error = %err.kind, "Co-star casting failed, refocusing beat");
                    beat.focus_character = FocusCharacter::Other;
                }
            }
        }

        self.commit(
            &ctx.token,
            vec![NarrativeEvent::NarrativeAttached {
                page_index,
                beat: beat.clone(),
            }],
        )?;

        self.report(ctx, ProgressStage::RenderingImage, position, Some(page_index));
        let image_request = ImageRequest {
            page_index,
            beat: beat.clone(),
            page_kind: kind,
            config: request.config.clone(),
            hero: request.hero.clone(),
            co_star: co_star.clone(),
            world: request.world.clone(),
        };
        let image_ref = self.render(&ctx.token, &image_request).await?;

        self.commit(
            &ctx.token,
            vec![NarrativeEvent::ImageAttached {
                page_index,
                image_ref: image_ref.clone(),
            }],
        )?;
        self.report(ctx, ProgressStage::RenderingImage, position + 1, Some(page_index));
        tracing::debug!("Page committed");

        let mut page = Page::placeholder(page_index, kind, is_decision);
        page.choices = beat.choices.clone();
        page.narrative = Some(beat);
        page.image_ref = Some(image_ref);
        page.is_loading = false;
        Ok(page)
    }

    /// Register a stage token, run the guarded call, deregister.
    async fn run_stage<T, F, Fut>(
        &self,
        stage: Stage,
        page: u32,
        batch: &CancellationToken,
        op: F,
    ) -> ProviderResult<T>
    where
        F: Fn(CancellationToken) -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        let token = self.cancellations.begin(page, stage, batch);
        let result = self.guard.run(stage, page, &token, op).await;
        self.cancellations.end(page, stage, &token);
        result
    }

    async fn story_beat(&self, batch: &CancellationToken, request: &BeatRequest) -> ProviderResult<Beat> {
        let page = request.page_number;
        // Guided beats are one-offs; only unguided ones are cacheable
        let key = request
            .guidance
            .is_none()
            .then(|| BeatKey::new(page, request.history.len(), &request.config));

        if let Some(key) = &key {
            if let Some(beat) = self.cache().get(key) {
                tracing::debug!("Using cached beat");
                return Ok(beat);
            }
        }

        let provider = &self.provider;
        let result = self
            .run_stage(Stage::Beat, page, batch, move |cancel| {
                provider.generate_beat(request, cancel)
            })
            .await;

        match result {
            Ok(beat) => {
                if let Some(key) = key {
                    self.cache().insert(key, beat.clone());
                }
                Ok(beat)
            }
            Err(err) if err.kind.is_malformed() => {
                tracing::warn!(error = %err.kind, "Beat response unusable, using fallback");
                Ok(fallback_beat(page, request.is_decision))
            }
            Err(err) => Err(err),
        }
    }

    async fn cast_co_star(
        &self,
        batch: &CancellationToken,
        page: u32,
        request: &BatchRequest,
        beat: &Beat,
    ) -> ProviderResult<Persona> {
        let description = format!(
            "A companion for {} ({}) who appears in this scene: {}",
            request.hero.name, request.hero.description, beat.scene
        );
        let genre = request.config.genre().as_str();
        let description = description.as_str();
        let provider = &self.provider;

        self.run_stage(Stage::Persona, page, batch, move |cancel| {
            provider.generate_persona(description, genre, cancel)
        })
        .await
    }

    async fn render(&self, batch: &CancellationToken, request: &ImageRequest) -> ProviderResult<ImageRef> {
        let provider = &self.provider;
        self.run_stage(Stage::Image, request.page_index, batch, move |cancel| {
            provider.generate_image(request, cancel)
        })
        .await
    }

    /// Cancel all in-flight work and abandon every loading page.
    ///
    /// Returns the number of stages that were in flight.
    #[tracing::instrument(skip(self))]
    pub fn abort(&self, reason: &str) -> usize {
        let (in_flight, progress) = self.cancellations.abort_all_with(reason, || {
            self.reservations.clear();
            self.store.dispatch(NarrativeEvent::GenerationAborted);
            self.store.snapshot().progress
        });
        if let Some(progress) = progress {
            self.schedule_progress_clear(progress.batch_id);
        }
        in_flight
    }

    /// Cancel everything, clear every registry and return the store to setup.
    #[tracing::instrument(skip(self))]
    pub fn reset(&self) {
        self.timers.cancel_all();
        self.cancellations.reset_session_with(|| {
            self.reservations.clear();
            self.cache().clear();
            self.store.dispatch(NarrativeEvent::SessionReset);
        });
    }

    /// Teardown: abort everything and drop pending timers without scheduling new ones.
    pub fn shutdown(&self) {
        self.timers.cancel_all();
        self.cancellations.abort_all_with("engine shutdown", || {
            self.reservations.clear();
            self.store.dispatch(NarrativeEvent::GenerationAborted);
        });
    }
}
