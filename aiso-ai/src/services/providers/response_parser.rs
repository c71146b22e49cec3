//! Reply parsing
//!
//! Providers are asked for bare JSON but often wrap it in prose or code
//! fences. The first balanced `{...}` block that parses as a JSON object is
//! taken as the reply; everything else is ignored.

use serde_json::{Map, Value};

use super::ProviderError;
use crate::models::{Categorization, TagSuggestion};

/// Return the first balanced `{...}` slice starting at or after `from`
///
/// Braces inside JSON string literals (including escaped quotes) do not count.
fn balanced_block(text: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let start = from + text[from..].find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((start, start + offset + 1));
                }
            }
            _ => {}
        }
    }
    None
}

/// First JSON object embedded in `text`
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let mut from = 0;
    while from < text.len() {
        let Some(start) = text[from..].find('{').map(|i| from + i) else {
            break;
        };
        if let Some((block_start, block_end)) = balanced_block(text, start) {
            if let Ok(Value::Object(map)) = serde_json::from_str(&text[block_start..block_end]) {
                return Some(map);
            }
        }
        from = start + 1;
    }
    None
}

fn object_or_error(text: &str) -> Result<Map<String, Value>, ProviderError> {
    extract_json_object(text).ok_or_else(|| {
        let preview: String = text.chars().take(80).collect();
        ProviderError::MalformedResponse(format!("no JSON object in reply: {:?}", preview))
    })
}

fn non_empty_str(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_list(map: &Map<String, Value>, key: &str) -> Vec<String> {
    match map.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

pub fn parse_categorization(text: &str) -> Result<Categorization, ProviderError> {
    let map = object_or_error(text)?;
    let confidence = map
        .get("confidence")
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite())
        .unwrap_or(0.0)
        .clamp(0.0, 1.0);

    Ok(Categorization {
        category: non_empty_str(&map, "category")
            .map(|c| c.to_lowercase())
            .unwrap_or_else(|| "unknown".to_string()),
        subcategory: non_empty_str(&map, "subcategory"),
        confidence,
        reasoning: non_empty_str(&map, "reasoning").unwrap_or_default(),
    })
}

pub fn parse_tagging(text: &str) -> Result<TagSuggestion, ProviderError> {
    let map = object_or_error(text)?;
    let defaults = TagSuggestion::default();

    Ok(TagSuggestion {
        tags: string_list(&map, "tags"),
        mood: non_empty_str(&map, "mood").unwrap_or(defaults.mood),
        energy: non_empty_str(&map, "energy").unwrap_or(defaults.energy),
        style: non_empty_str(&map, "style").unwrap_or(defaults.style),
        characteristics: string_list(&map, "characteristics"),
        use_case: non_empty_str(&map, "useCase").or_else(|| non_empty_str(&map, "use_case")),
    })
}

/// Candidate indices named under `matches`, in reply order
///
/// Indices outside `0..candidate_count` and repeats are dropped. An
/// unparsable reply yields an empty list.
pub fn parse_search_matches(text: &str, candidate_count: usize) -> Vec<usize> {
    let Some(map) = extract_json_object(text) else {
        return Vec::new();
    };
    let Some(Value::Array(items)) = map.get("matches") else {
        return Vec::new();
    };

    let mut indices = Vec::new();
    for index in items.iter().filter_map(Value::as_u64) {
        let index = index as usize;
        if index < candidate_count && !indices.contains(&index) {
            indices.push(index);
        }
    }
    indices
}
