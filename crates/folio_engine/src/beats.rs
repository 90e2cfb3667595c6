//! Local beat synthesis and normalisation.

use folio_core::{Beat, FocusCharacter, Persona, StoryConfig, World};

/// Caption suffix carried by the last story page.
pub const CONTINUATION_MARKER: &str = "TO BE CONTINUED...";

/// Choices used to pad decision pages the provider under-filled.
pub const NEUTRAL_CHOICES: [&str; 2] = ["Press onward", "Take a different path"];

/// Beat used when the provider keeps answering with something unparseable.
pub fn fallback_beat(page_index: u32, is_decision: bool) -> Beat {
    let beat = Beat::new(
        "The hero pauses, taking in the scene as the story gathers itself",
        FocusCharacter::Hero,
    )
    .with_caption(format!("Page {}. A quiet moment passes.", page_index))
    .with_dialogue("What happens next?");

    if is_decision {
        beat.with_choices(NEUTRAL_CHOICES)
    } else {
        beat
    }
}

/// Beat for page 0, built from the configuration and cast.
pub fn cover_beat(
    config: &StoryConfig,
    hero: &Persona,
    co_star: Option<&Persona>,
    world: Option<&World>,
) -> Beat {
    let mut scene = format!(
        "Comic book cover art in a {} {} style featuring {}",
        config.tone().to_lowercase(),
        config.genre().to_lowercase(),
        hero.name
    );
    if let Some(co_star) = co_star {
        scene.push_str(&format!(" alongside {}", co_star.name));
    }
    if let Some(world) = world {
        scene.push_str(&format!(", set in {}", world.name));
    }
    scene.push_str(", dramatic title composition");

    let caption = match world {
        Some(world) => format!("{} of {}", hero.name, world.name),
        None => format!("The {} of {}", config.genre(), hero.name),
    };

    Beat::new(scene, FocusCharacter::Hero).with_caption(caption)
}

/// Beat for the page after the last story page.
pub fn back_cover_beat(config: &StoryConfig, hero: &Persona) -> Beat {
    Beat::new(
        format!(
            "Comic book back cover in a {} style, {} silhouetted against the horizon",
            config.genre().to_lowercase(),
            hero.name
        ),
        FocusCharacter::Hero,
    )
    .with_caption(format!("{} will return.", hero.name))
}

fn clean(text: Option<String>) -> Option<String> {
    text.map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Enforce page-position rules on a beat.
///
/// - blank caption and dialogue become `None`, a blank scene gets a generic one
/// - decision pages carry at least two distinct choices, padded from
///   [`NEUTRAL_CHOICES`]
/// - other pages carry no choices, except the final page which keeps any
///   it was given
/// - the final page's caption ends with [`CONTINUATION_MARKER`]
///
/// # Examples
///
/// ```
/// use folio_core::{Beat, FocusCharacter};
/// use folio_engine::{CONTINUATION_MARKER, normalize_beat};
///
/// let beat = Beat::new("A cliff edge", FocusCharacter::Hero).with_choices(["Jump"]);
/// let beat = normalize_beat(beat, true, false);
/// assert_eq!(beat.choices.len(), 2);
///
/// let last = normalize_beat(Beat::new("Dawn", FocusCharacter::Hero), false, true);
/// assert!(last.caption.unwrap().ends_with(CONTINUATION_MARKER));
/// ```
pub fn normalize_beat(beat: Beat, is_decision: bool, is_final: bool) -> Beat {
    let scene = beat.scene.trim();
    let scene = if scene.is_empty() {
        "A wide establishing shot of the scene".to_string()
    } else {
        scene.to_string()
    };

    let mut choices: Vec<String> = Vec::new();
    if is_decision || is_final {
        for choice in beat.choices {
            let choice = choice.trim();
            if !choice.is_empty() && !choices.iter().any(|seen| seen == choice) {
                choices.push(choice.to_string());
            }
        }
    }
    if is_decision {
        for neutral in NEUTRAL_CHOICES {
            if choices.len() >= 2 {
                break;
            }
            if !choices.iter().any(|seen| seen == neutral) {
                choices.push(neutral.to_string());
            }
        }
    }

    let mut caption = clean(beat.caption);
    if is_final {
        caption = Some(match caption {
            Some(text) if text.ends_with(CONTINUATION_MARKER) => text,
            Some(text) => format!("{} {}", text, CONTINUATION_MARKER),
            None => CONTINUATION_MARKER.to_string(),
        });
    }

    Beat {
        caption,
        dialogue: clean(beat.dialogue),
        scene,
        focus_character: beat.focus_character,
        choices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinary_page_drops_choices() {
        let beat = Beat::new("Market", FocusCharacter::Other).with_choices(["a", "b"]);
        assert!(normalize_beat(beat, false, false).choices.is_empty());
    }

    #[test]
    fn test_decision_page_keeps_and_dedupes_choices() {
        let beat = Beat::new("Fork", FocusCharacter::Hero)
            .with_choices([" Forgive ", "Forgive", "Fight", ""]);
        let beat = normalize_beat(beat, true, false);
        assert_eq!(beat.choices, vec!["Forgive".to_string(), "Fight".to_string()]);
    }

    #[test]
    fn test_decision_page_padded_without_duplicates() {
        let beat = Beat::new("Fork", FocusCharacter::Hero).with_choices([NEUTRAL_CHOICES[0]]);
        let beat = normalize_beat(beat, true, false);
        assert_eq!(
            beat.choices,
            vec![NEUTRAL_CHOICES[0].to_string(), NEUTRAL_CHOICES[1].to_string()]
        );
    }

    #[test]
    fn test_final_marker_not_duplicated() {
        let beat = Beat::new("Dawn", FocusCharacter::Hero)
            .with_caption(format!("Home at last. {}", CONTINUATION_MARKER));
        let caption = normalize_beat(beat, false, true).caption.unwrap();
        assert_eq!(caption.matches(CONTINUATION_MARKER).count(), 1);
    }

    #[test]
    fn test_blank_fields_cleaned() {
        let beat = Beat::new("   ", FocusCharacter::Hero)
            .with_caption("  ")
            .with_dialogue(" Hi ");
        let beat = normalize_beat(beat, false, false);
        assert!(beat.caption.is_none());
        assert_eq!(beat.dialogue.as_deref(), Some("Hi"));
        assert!(!beat.scene.is_empty());
    }

    #[test]
    fn test_fallback_is_valid_for_decision_pages() {
        let beat = fallback_beat(5, true);
        assert!(beat.choices.len() >= 2);
        assert!(!beat.scene.is_empty());
        assert!(fallback_beat(4, false).choices.is_empty());
    }

    #[test]
    fn test_cover_mentions_cast_and_world() {
        let hero = Persona::new("Mara", "keeper", "art://mara");
        let co_star = Persona::new("Kit", "smuggler", "art://kit");
        let world = World::new("Saltmere", "fog");

        let beat = cover_beat(&StoryConfig::default(), &hero, Some(&co_star), Some(&world));
        assert!(beat.scene.contains("Mara"));
        assert!(beat.scene.contains("Kit"));
        assert!(beat.scene.contains("Saltmere"));
        assert_eq!(beat.caption.as_deref(), Some("Mara of Saltmere"));
    }
}
