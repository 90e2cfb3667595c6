//! AI provider adapter trait.

use crate::{BeatRequest, ImageRequest};
use async_trait::async_trait;
use folio_core::{Beat, ImageRef, Persona};
use folio_error::ProviderResult;
use tokio_util::sync::CancellationToken;

/// Adapter over a generative AI backend.
///
/// Every call receives the cancellation token of the stage it runs in.
/// Implementations should check it before starting network I/O and return
/// [`ProviderErrorKind::Cancelled`](folio_error::ProviderErrorKind::Cancelled)
/// when it fires. The engine also races each call against its token, so a
/// late result is dropped even if the adapter ignores it.
#[async_trait]
pub trait StoryProvider: Send + Sync {
    /// Cast a persona (name, description, reference art) from a description.
    async fn generate_persona(
        &self,
        description: &str,
        genre: &str,
        cancel: CancellationToken,
    ) -> ProviderResult<Persona>;

    /// Write the beat for one page.
    ///
    /// Adapters that receive free-form model output can use
    /// `folio_engine::parse_beat` to turn it into a [`Beat`].
    async fn generate_beat(
        &self,
        request: &BeatRequest,
        cancel: CancellationToken,
    ) -> ProviderResult<Beat>;

    /// Render the panel for one page.
    async fn generate_image(
        &self,
        request: &ImageRequest,
        cancel: CancellationToken,
    ) -> ProviderResult<ImageRef>;

    /// Provider name (e.g., "gemini", "mock").
    fn provider_name(&self) -> &'static str;
}
