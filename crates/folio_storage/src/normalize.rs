//! Normalisation rules applied to stored entities.

use folio_core::{GenerationPreset, MAX_WORLD_IMAGES, Persona, World};

/// Name given to a persona saved without one.
pub const DEFAULT_PERSONA_NAME: &str = "Unnamed Hero";
/// Name given to a world saved without one.
pub const DEFAULT_WORLD_NAME: &str = "Unnamed World";
/// Name given to a preset saved without one.
pub const DEFAULT_PRESET_NAME: &str = "Untitled Preset";

fn name_or(name: &str, fallback: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Trim text fields and fill in a default name.
pub fn normalize_persona(persona: &Persona) -> Persona {
    Persona {
        id: persona.id.trim().to_string(),
        name: name_or(&persona.name, DEFAULT_PERSONA_NAME),
        description: persona.description.trim().to_string(),
        image_ref: persona.image_ref.clone(),
    }
}

/// Trim text fields, cap reference images and deduplicate persona links.
///
/// # Examples
///
/// ```
/// use folio_core::World;
/// use folio_storage::normalize::normalize_world;
///
/// let world = World::new("  ", " Misty isles ")
///     .with_image_refs(vec!["a".into(), "b".into(), "c".into(), "d".into()])
///     .with_persona_ids(vec!["p1".into(), "p2".into(), "p1".into()]);
///
/// let world = normalize_world(&world);
/// assert_eq!(world.name, "Unnamed World");
/// assert_eq!(world.description, "Misty isles");
/// assert_eq!(world.image_refs.len(), 3);
/// assert_eq!(world.persona_ids, vec!["p1".to_string(), "p2".to_string()]);
/// ```
pub fn normalize_world(world: &World) -> World {
    let mut persona_ids: Vec<String> = Vec::with_capacity(world.persona_ids.len());
    for id in &world.persona_ids {
        let id = id.trim();
        if !id.is_empty() && !persona_ids.iter().any(|seen| seen == id) {
            persona_ids.push(id.to_string());
        }
    }

    World {
        id: world.id.trim().to_string(),
        name: name_or(&world.name, DEFAULT_WORLD_NAME),
        description: world.description.trim().to_string(),
        image_refs: world
            .image_refs
            .iter()
            .take(MAX_WORLD_IMAGES)
            .cloned()
            .collect(),
        persona_ids,
    }
}

/// Trim the name and drop blank cast links.
pub fn normalize_preset(preset: &GenerationPreset) -> GenerationPreset {
    let link = |id: &Option<String>| {
        id.as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    };

    GenerationPreset {
        id: preset.id.trim().to_string(),
        name: name_or(&preset.name, DEFAULT_PRESET_NAME),
        config: preset.config.clone(),
        hero_id: link(&preset.hero_id),
        world_id: link(&preset.world_id),
    }
}
