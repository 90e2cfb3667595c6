//! Scriptable provider for engine tests.

use async_trait::async_trait;
use folio_core::{Beat, ImageRef, Persona, Stage};
use folio_engine::parse_beat;
use folio_error::{ProviderError, ProviderErrorKind, ProviderResult};
use folio_interface::{BeatRequest, ImageRequest, StoryProvider};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// A single scripted response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Raw model text, parsed like an adapter would
    Text(String),
    /// Fail with this error
    Error(ProviderErrorKind),
}

/// Holds a call open until the test releases it.
///
/// The gated call ignores its cancellation token, like an adapter that
/// never checks it.
#[derive(Debug, Default)]
pub struct Gate {
    /// Notified when the call starts waiting
    pub entered: Notify,
    /// Notify to let the call finish
    pub release: Notify,
}

#[derive(Debug, Default)]
struct MockState {
    beats: HashMap<u32, VecDeque<MockResponse>>,
    images: HashMap<u32, VecDeque<ProviderErrorKind>>,
    personas: VecDeque<ProviderErrorKind>,
    gates: HashMap<(Stage, u32), Arc<Gate>>,
    beat_requests: Vec<BeatRequest>,
    image_requests: Vec<ImageRequest>,
    persona_calls: Vec<String>,
}

/// Provider whose answers are scripted per page.
///
/// Unscripted beat calls answer with a valid JSON beat framed on the hero,
/// with two choices on decision pages.
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a provider that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Queue a beat response for `page`.
    pub fn script_beat(&self, page: u32, response: MockResponse) -> &Self {
        self.state()
            .beats
            .entry(page)
            .or_default()
            .push_back(response);
        self
    }

    /// Queue an image failure for `page`.
    pub fn fail_image(&self, page: u32, error: ProviderErrorKind) -> &Self {
        self.state()
            .images
            .entry(page)
            .or_default()
            .push_back(error);
        self
    }

    /// Queue a persona failure.
    pub fn fail_persona(&self, error: ProviderErrorKind) -> &Self {
        self.state().personas.push_back(error);
        self
    }

    /// Hold the next `stage` call for `page` until released.
    pub fn gate(&self, stage: Stage, page: u32) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.state().gates.insert((stage, page), gate.clone());
        gate
    }

    /// Beat requests received, in order.
    pub fn beat_requests(&self) -> Vec<BeatRequest> {
        self.state().beat_requests.clone()
    }

    /// Beat request received for `page`, the last one if several.
    pub fn beat_request_for(&self, page: u32) -> Option<BeatRequest> {
        self.state()
            .beat_requests
            .iter()
            .rev()
            .find(|request| request.page_number == page)
            .cloned()
    }

    /// Image requests received, in order.
    pub fn image_requests(&self) -> Vec<ImageRequest> {
        self.state().image_requests.clone()
    }

    /// Descriptions passed to `generate_persona`.
    pub fn persona_calls(&self) -> Vec<String> {
        self.state().persona_calls.clone()
    }

    /// Default model text for `page`.
    pub fn default_beat_text(page: u32, is_decision: bool) -> String {
        let choices = if is_decision {
            r#"["Forgive", "Fight"]"#
        } else {
            "[]"
        };
        format!(
            r#"Here is the page:
```json
{{"caption": "Page {page}", "dialogue": "Onward!", "scene": "Scene for page {page}", "focusCharacter": "hero", "choices": {choices}}}
```"#
        )
    }

    async fn pass_gate(&self, stage: Stage, page: u32) {
        let gate = self.state().gates.remove(&(stage, page));
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
    }
}

#[async_trait]
impl StoryProvider for MockProvider {
    async fn generate_persona(
        &self,
        description: &str,
        _genre: &str,
        _cancel: CancellationToken,
    ) -> ProviderResult<Persona> {
        let scripted = {
            let mut state = self.state();
            state.persona_calls.push(description.to_string());
            state.personas.pop_front()
        };
        match scripted {
            Some(error) => Err(ProviderError::new(error)),
            None => Ok(Persona::new(
                "Bram",
                description,
                ImageRef::new("img://persona/bram"),
            )),
        }
    }

    async fn generate_beat(
        &self,
        request: &BeatRequest,
        _cancel: CancellationToken,
    ) -> ProviderResult<Beat> {
        let page = request.page_number;
        let scripted = {
            let mut state = self.state();
            state.beat_requests.push(request.clone());
            state.beats.get_mut(&page).and_then(VecDeque::pop_front)
        };
        self.pass_gate(Stage::Beat, page).await;

        match scripted {
            Some(MockResponse::Text(text)) => parse_beat(&text),
            Some(MockResponse::Error(error)) => Err(ProviderError::new(error)),
            None => parse_beat(&Self::default_beat_text(page, request.is_decision)),
        }
    }

    async fn generate_image(
        &self,
        request: &ImageRequest,
        _cancel: CancellationToken,
    ) -> ProviderResult<ImageRef> {
        let page = request.page_index;
        let scripted = {
            let mut state = self.state();
            state.image_requests.push(request.clone());
            state.images.get_mut(&page).and_then(VecDeque::pop_front)
        };
        self.pass_gate(Stage::Image, page).await;

        match scripted {
            Some(error) => Err(ProviderError::new(error)),
            None => Ok(ImageRef::new(format!("img://page-{}", page))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}
