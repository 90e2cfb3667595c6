//! Persistence abstraction for the cast and saved presets.

use async_trait::async_trait;
use folio_core::{GenerationPreset, Persona, World};
use folio_error::StorageResult;

/// Library of personas, worlds and generation presets.
///
/// Implementations return normalized entities: trimmed names and
/// descriptions, a default name when empty, at most three world images and
/// deduplicated persona links. Errors carry a
/// [`StorageErrorKind`](folio_error::StorageErrorKind) that tells retryable
/// I/O failures apart from fatal ones.
///
/// The engine never calls this trait; the surrounding application loads the
/// cast before launch and saves what the session produced.
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Save a persona, returning the normalized record.
    async fn save_persona(&self, persona: &Persona) -> StorageResult<Persona>;

    /// Load a persona by id.
    async fn load_persona(&self, id: &str) -> StorageResult<Persona>;

    /// List all saved personas, sorted by name.
    async fn list_personas(&self) -> StorageResult<Vec<Persona>>;

    /// Delete a persona and unlink it from every world.
    async fn delete_persona(&self, id: &str) -> StorageResult<()>;

    /// Save a world, returning the normalized record.
    async fn save_world(&self, world: &World) -> StorageResult<World>;

    /// Load a world by id.
    async fn load_world(&self, id: &str) -> StorageResult<World>;

    /// List all saved worlds, sorted by name.
    async fn list_worlds(&self) -> StorageResult<Vec<World>>;

    /// Delete a world.
    async fn delete_world(&self, id: &str) -> StorageResult<()>;

    /// Save a generation preset, returning the normalized record.
    async fn save_preset(&self, preset: &GenerationPreset) -> StorageResult<GenerationPreset>;

    /// Load a generation preset by id.
    async fn load_preset(&self, id: &str) -> StorageResult<GenerationPreset>;

    /// List all saved presets, sorted by name.
    async fn list_presets(&self) -> StorageResult<Vec<GenerationPreset>>;
}
