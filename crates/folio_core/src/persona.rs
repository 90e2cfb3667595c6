//! Cast members and the worlds they inhabit.

use crate::ImageRef;
use serde::{Deserialize, Serialize};

/// Maximum number of reference images attached to a world.
pub const MAX_WORLD_IMAGES: usize = 3;

/// A character with reference art used for visual consistency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    /// Stable identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Appearance and personality notes
    pub description: String,
    /// Reference art for consistent renders
    pub image_ref: ImageRef,
}

impl Persona {
    /// Create a persona with a fresh identifier.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        image_ref: impl Into<ImageRef>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            image_ref: image_ref.into(),
        }
    }
}

/// A setting with up to [`MAX_WORLD_IMAGES`] reference images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    /// Stable identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Setting description
    pub description: String,
    /// Reference art, capped at three
    #[serde(default)]
    pub image_refs: Vec<ImageRef>,
    /// Personas that belong to this world
    #[serde(default)]
    pub persona_ids: Vec<String>,
}

impl World {
    /// Create an empty world with a fresh identifier.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            image_refs: Vec::new(),
            persona_ids: Vec::new(),
        }
    }

    /// Builder method to set the reference images.
    pub fn with_image_refs(mut self, image_refs: Vec<ImageRef>) -> Self {
        self.image_refs = image_refs;
        self
    }

    /// Builder method to link personas.
    pub fn with_persona_ids(mut self, persona_ids: Vec<String>) -> Self {
        self.persona_ids = persona_ids;
        self
    }
}
