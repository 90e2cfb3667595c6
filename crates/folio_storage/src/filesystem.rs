//! Filesystem-based library implementation.

use crate::normalize::{normalize_persona, normalize_preset, normalize_world};
use async_trait::async_trait;
use folio_core::{GenerationPreset, Persona, World};
use folio_error::{StorageError, StorageErrorKind, StorageResult};
use folio_interface::LibraryStore;
use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};

const PERSONAS: &str = "personas";
const WORLDS: &str = "worlds";
const PRESETS: &str = "presets";

/// Filesystem library backend.
///
/// Stores each entity as a JSON document:
///
/// ```text
/// {base_path}/
/// ├── personas/{id}.json
/// ├── worlds/{id}.json
/// └── presets/{id}.json
/// ```
///
/// Writes go to a temp file first and are renamed into place, so a crash
/// never leaves a half-written record behind.
#[derive(Debug, Clone)]
pub struct FileSystemLibrary {
    base_path: PathBuf,
}

impl FileSystemLibrary {
    /// Create a new filesystem library rooted at `base_path`.
    ///
    /// Creates the entity directories if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns error if a directory cannot be created.
    #[tracing::instrument(skip(base_path))]
    pub fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        for dir in [PERSONAS, WORLDS, PRESETS] {
            let path = base_path.join(dir);
            std::fs::create_dir_all(&path).map_err(|e| {
                let message = format!("{}: {}", path.display(), e);
                if e.kind() == std::io::ErrorKind::PermissionDenied {
                    StorageError::new(StorageErrorKind::PermissionDenied(message))
                } else {
                    StorageError::new(StorageErrorKind::DirectoryCreation(message))
                }
            })?;
        }

        tracing::info!(path = %base_path.display(), "Created filesystem library");
        Ok(Self { base_path })
    }

    /// Create a library in the platform data directory (`<data_dir>/folio`).
    ///
    /// # Errors
    ///
    /// Returns error if the platform has no data directory or it cannot be created.
    pub fn in_data_dir() -> StorageResult<Self> {
        let base = dirs::data_dir().ok_or_else(|| {
            StorageError::new(StorageErrorKind::Unavailable(
                "no platform data directory".to_string(),
            ))
        })?;
        Self::new(base.join("folio"))
    }

    /// Root directory of the library.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path of a record, rejecting ids that could escape the entity directory.
    fn record_path(&self, kind: &str, id: &str) -> StorageResult<PathBuf> {
        let id = id.trim();
        let valid = !id.is_empty()
            && id != "."
            && id != ".."
            && !id.contains(['/', '\\'])
            && !id.contains('\0');
        if !valid {
            return Err(StorageError::new(StorageErrorKind::InvalidPath(format!(
                "{}/{}",
                kind, id
            ))));
        }
        Ok(self.base_path.join(kind).join(format!("{}.json", id)))
    }

    async fn write_record<T: Serialize>(&self, kind: &str, id: &str, value: &T) -> StorageResult<()> {
        let path = self.record_path(kind, id)?;
        let json = serde_json::to_vec_pretty(value).map_err(|e| {
            StorageError::new(StorageErrorKind::Corrupt(format!("{}: {}", path.display(), e)))
        })?;

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &json)
            .await
            .map_err(|e| StorageError::from_io(temp_path.display(), &e, true))?;
        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            StorageError::from_io(
                format!("rename {} to {}", temp_path.display(), path.display()),
                &e,
                true,
            )
        })?;

        tracing::debug!(path = %path.display(), bytes = json.len(), "Wrote record");
        Ok(())
    }

    async fn read_record<T: DeserializeOwned>(&self, kind: &str, id: &str) -> StorageResult<T> {
        let path = self.record_path(kind, id)?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| StorageError::from_io(path.display(), &e, false))?;
        serde_json::from_slice(&data).map_err(|e| {
            StorageError::new(StorageErrorKind::Corrupt(format!("{}: {}", path.display(), e)))
        })
    }

    async fn list_records<T: DeserializeOwned>(&self, kind: &str) -> StorageResult<Vec<T>> {
        let dir = self.base_path.join(kind);
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| StorageError::from_io(dir.display(), &e, false))?;

        let mut records = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::from_io(dir.display(), &e, false))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let data = tokio::fs::read(&path)
                .await
                .map_err(|e| StorageError::from_io(path.display(), &e, false))?;
            match serde_json::from_slice(&data) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable record");
                }
            }
        }
        Ok(records)
    }

    async fn delete_record(&self, kind: &str, id: &str) -> StorageResult<()> {
        let path = self.record_path(kind, id)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::from_io(path.display(), &e, true))?;
        tracing::debug!(path = %path.display(), "Deleted record");
        Ok(())
    }
}

#[async_trait]
impl LibraryStore for FileSystemLibrary {
    #[tracing::instrument(skip(self, persona), fields(id = %persona.id))]
    async fn save_persona(&self, persona: &Persona) -> StorageResult<Persona> {
        let persona = normalize_persona(persona);
        self.write_record(PERSONAS, &persona.id, &persona).await?;
        Ok(persona)
    }

    #[tracing::instrument(skip(self))]
    async fn load_persona(&self, id: &str) -> StorageResult<Persona> {
        let persona: Persona = self.read_record(PERSONAS, id).await?;
        Ok(normalize_persona(&persona))
    }

    #[tracing::instrument(skip(self))]
    async fn list_personas(&self) -> StorageResult<Vec<Persona>> {
        let mut personas: Vec<Persona> = self
            .list_records::<Persona>(PERSONAS)
            .await?
            .iter()
            .map(normalize_persona)
            .collect();
        personas.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(personas)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_persona(&self, id: &str) -> StorageResult<()> {
        self.delete_record(PERSONAS, id).await?;

        let id = id.trim();
        for world in self.list_records::<World>(WORLDS).await? {
            if world.persona_ids.iter().any(|linked| linked.trim() == id) {
                let mut world = normalize_world(&world);
                world.persona_ids.retain(|linked| linked != id);
                self.write_record(WORLDS, &world.id, &world).await?;
                tracing::debug!(world = %world.id, "Unlinked deleted persona");
            }
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, world), fields(id = %world.id))]
    async fn save_world(&self, world: &World) -> StorageResult<World> {
        let world = normalize_world(world);
        self.write_record(WORLDS, &world.id, &world).await?;
        Ok(world)
    }

    #[tracing::instrument(skip(self))]
    async fn load_world(&self, id: &str) -> StorageResult<World> {
        let world: World = self.read_record(WORLDS, id).await?;
        Ok(normalize_world(&world))
    }

    #[tracing::instrument(skip(self))]
    async fn list_worlds(&self) -> StorageResult<Vec<World>> {
        let mut worlds: Vec<World> = self
            .list_records::<World>(WORLDS)
            .await?
            .iter()
            .map(normalize_world)
            .collect();
        worlds.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(worlds)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_world(&self, id: &str) -> StorageResult<()> {
        self.delete_record(WORLDS, id).await
    }

    #[tracing::instrument(skip(self, preset), fields(id = %preset.id))]
    async fn save_preset(&self, preset: &GenerationPreset) -> StorageResult<GenerationPreset> {
        let preset = normalize_preset(preset);
        self.write_record(PRESETS, &preset.id, &preset).await?;
        Ok(preset)
    }

    #[tracing::instrument(skip(self))]
    async fn load_preset(&self, id: &str) -> StorageResult<GenerationPreset> {
        let preset: GenerationPreset = self.read_record(PRESETS, id).await?;
        Ok(normalize_preset(&preset))
    }

    #[tracing::instrument(skip(self))]
    async fn list_presets(&self) -> StorageResult<Vec<GenerationPreset>> {
        let mut presets: Vec<GenerationPreset> = self
            .list_records::<GenerationPreset>(PRESETS)
            .await?
            .iter()
            .map(normalize_preset)
            .collect();
        presets.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(presets)
    }
}
