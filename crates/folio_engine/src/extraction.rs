//! Utilities for turning free-form model output into beats.
//!
//! Model responses often wrap JSON in markdown code blocks or surround it
//! with explanatory text. Adapter implementations can hand the raw text to
//! [`parse_beat`] instead of writing their own scraping.

use folio_core::Beat;
use folio_error::{ProviderError, ProviderErrorKind, ProviderResult};

/// Extract a JSON object from a response that may contain markdown or extra text.
///
/// This function tries, in order:
/// 1. Markdown code blocks: ```json ... ``` or ``` ... ```
/// 2. Balanced braces: { ... }
///
/// # Errors
///
/// Returns [`ProviderErrorKind::MalformedResponse`] if no JSON is found.
///
/// # Examples
///
/// ```
/// use folio_engine::extract_json;
///
/// let response = "Here is page 3:\n```json\n{\"scene\": \"A bridge\"}\n```\n";
/// assert_eq!(extract_json(response).unwrap(), "{\"scene\": \"A bridge\"}");
/// ```
pub fn extract_json(response: &str) -> ProviderResult<String> {
    if let Some(block) = extract_from_code_block(response) {
        if let Some(json) = extract_balanced(&block, '{', '}') {
            return Ok(json);
        }
    }

    if let Some(json) = extract_balanced(response, '{', '}') {
        return Ok(json);
    }

    tracing::warn!(response_length = response.len(), "No JSON found in beat response");
    Err(ProviderError::new(ProviderErrorKind::MalformedResponse(
        format!("No JSON object found in response (length: {})", response.len()),
    )))
}

/// Parse and validate a beat from raw model output.
///
/// # Errors
///
/// Returns [`ProviderErrorKind::MalformedResponse`] if no JSON is found, it
/// does not match the beat schema, or the scene is empty.
///
/// # Examples
///
/// ```
/// use folio_core::FocusCharacter;
/// use folio_engine::parse_beat;
///
/// let beat = parse_beat(
///     r#"Sure! {"caption": "Night falls", "scene": "A tower", "focus_character": "co_star"}"#,
/// ).unwrap();
/// assert_eq!(beat.focus_character, FocusCharacter::CoStar);
///
/// assert!(parse_beat("I cannot draw that").is_err());
/// ```
pub fn parse_beat(response: &str) -> ProviderResult<Beat> {
    let json = extract_json(response)?;
    let beat: Beat = serde_json::from_str(&json).map_err(|e| {
        let preview: String = json.chars().take(100).collect();
        tracing::warn!(error = %e, json_preview = %preview, "Beat JSON did not match schema");
        ProviderError::new(ProviderErrorKind::MalformedResponse(format!(
            "Failed to parse beat: {}",
            e
        )))
    })?;

    if beat.scene.trim().is_empty() {
        return Err(ProviderError::new(ProviderErrorKind::MalformedResponse(
            "Beat has an empty scene".to_string(),
        )));
    }
    Ok(beat)
}

/// Extract content from the first markdown code block.
fn extract_from_code_block(response: &str) -> Option<String> {
    let start = response.find("```")?;
    let content_start = start + 3;
    // Skip the language specifier line
    let skip_to = response[content_start..]
        .find('\n')
        .map(|n| content_start + n + 1)
        .unwrap_or(content_start);

    match response[skip_to..].find("```") {
        Some(end) => Some(response[skip_to..skip_to + end].trim().to_string()),
        // Truncated response: take everything after the fence
        None => Some(response[skip_to..].trim().to_string()),
    }
}

/// Extract content between balanced delimiters, ignoring delimiters inside strings.
fn extract_balanced(response: &str, open: char, close: char) -> Option<String> {
    let start = response.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in response[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(response[start..start + i + ch.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_unlabelled_fence() {
        let response = "```\n{\"scene\": \"Rooftops\"}\n```";
        assert_eq!(extract_json(response).unwrap(), "{\"scene\": \"Rooftops\"}");
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let response = r#"Result: {"scene": "A sign reading \"{closed}\"", "choices": []} trailing"#;
        let json = extract_json(response).unwrap();
        assert!(json.ends_with("[]}"));
        assert!(parse_beat(response).is_ok());
    }

    #[test]
    fn test_unbalanced_json_is_malformed() {
        let err = parse_beat("{\"scene\": \"cut off").unwrap_err();
        assert!(err.kind.is_malformed());
    }

    #[test]
    fn test_schema_violation_is_malformed() {
        let err = parse_beat(r#"{"caption": "no scene here"}"#).unwrap_err();
        assert!(err.kind.is_malformed());

        let err = parse_beat(r#"{"scene": "   "}"#).unwrap_err();
        assert!(err.kind.is_malformed());
    }

    #[test]
    fn test_camel_case_wire_form() {
        let beat = parse_beat(
            r#"{"scene": "Docks", "focusCharacter": "other", "choices": ["Run", "Hide"]}"#,
        )
        .unwrap();
        assert_eq!(beat.choices.len(), 2);
    }
}
