//! Completion requests for each provider operation
//!
//! Token budgets and temperatures are per operation and identical for both
//! providers.

use super::classify::SampleDescriptor;
use super::CompletionRequest;
use crate::config::{CATEGORIES, MOODS, STYLES};
use crate::models::Sample;

const CATEGORIZE_SYSTEM: &str = "You are an expert audio engineer and music producer. \
Analyze audio sample metadata and categorize samples into specific types. Respond only with valid JSON.";

const TAGGING_SYSTEM: &str = "You are an expert music producer. Generate descriptive tags for \
audio samples based on their characteristics. Focus on mood, energy, style, and sonic qualities. \
Respond only with valid JSON.";

const SEARCH_SYSTEM: &str = "You help music producers find samples in their library. \
Respond only with valid JSON.";

const DESCRIPTION_SYSTEM: &str = "You are a music expert writing short descriptions of audio samples.";

fn or_unknown<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "unknown".to_string())
}

fn duration_text(duration: Option<f64>) -> String {
    duration
        .map(|d| format!("{:.2} seconds", d))
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn categorization(sample: &SampleDescriptor) -> CompletionRequest {
    let prompt = format!(
        r#"Audio Sample Details:
- File: {name}
- Duration: {duration}
- Bitrate: {bitrate} kbps
- Sample Rate: {sample_rate} Hz
- Channels: {channels}

Available categories: {categories}

Based on the filename, duration, and technical specs, determine the most likely category. Consider:
- Short samples (< 2s) are likely one-shots (kicks, snares, FX)
- Longer samples (> 8s) are likely loops or melodic content
- Filename patterns and common naming conventions

Respond with valid JSON only:
{{
  "category": "primary_category",
  "subcategory": "specific_type_if_applicable",
  "confidence": 0.85,
  "reasoning": "brief explanation of decision"
}}"#,
        name = sample.name,
        duration = duration_text(sample.duration),
        bitrate = or_unknown(sample.bitrate),
        sample_rate = or_unknown(sample.sample_rate),
        channels = or_unknown(sample.channels),
        categories = CATEGORIES.join(", "),
    );

    CompletionRequest {
        system: CATEGORIZE_SYSTEM.to_string(),
        prompt,
        max_tokens: 300,
        temperature: 0.3,
    }
}

pub fn tagging(sample: &SampleDescriptor, category: Option<&str>) -> CompletionRequest {
    let bpm_line = sample
        .bpm
        .map(|bpm| format!("- BPM: {}\n", bpm))
        .unwrap_or_default();

    let prompt = format!(
        r#"Sample Information:
- File: {name}
- Duration: {duration}
- Category: {category}
{bpm_line}
Generate tags considering:
1. Mood options: {moods}
2. Style options: {styles}
3. Energy levels: low, medium, high
4. Sonic characteristics: warm, bright, dark, punchy, smooth, crisp, distorted, clean, etc.
5. Use cases: intro, breakdown, drop, ambient, transition, etc.

Respond with valid JSON only:
{{
  "tags": ["descriptive", "tags", "here"],
  "mood": "primary_mood",
  "energy": "energy_level",
  "style": "musical_style",
  "characteristics": ["sonic", "qualities"],
  "useCase": "suggested_use"
}}"#,
        name = sample.name,
        duration = duration_text(sample.duration),
        category = category.unwrap_or("unknown"),
        moods = MOODS.join(", "),
        styles = STYLES.join(", "),
    );

    CompletionRequest {
        system: TAGGING_SYSTEM.to_string(),
        prompt,
        max_tokens: 400,
        temperature: 0.5,
    }
}

pub fn search(query: &str, candidates: &[Sample]) -> CompletionRequest {
    let sample_list = candidates
        .iter()
        .enumerate()
        .map(|(index, sample)| {
            format!(
                "{}: \"{}\" | {} | {} | {}",
                index,
                sample.name,
                sample.category.as_deref().unwrap_or("unknown"),
                sample.tags.join(", "),
                sample.mood.as_deref().unwrap_or(""),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = format!(
        r#"User's search query: "{query}"

Available samples (index: name | category | tags | mood):
{sample_list}

Find samples that match the user's intent. Consider direct keyword matches in names and tags,
semantic similarity, musical context and mood or style associations.

Respond with valid JSON only:
{{
  "matches": [0, 5, 12],
  "reasoning": "explanation of why these samples match the query"
}}"#
    );

    CompletionRequest {
        system: SEARCH_SYSTEM.to_string(),
        prompt,
        max_tokens: 500,
        temperature: 0.3,
    }
}

pub fn description(sample: &Sample) -> CompletionRequest {
    let prompt = format!(
        r#"Create a description for this audio sample:

File: {name}
Duration: {duration}
Category: {category}
BPM: {bpm}
Tags: {tags}
Mood: {mood}
Energy: {energy}

Write a concise paragraph that captures its musical characteristics, potential use cases and distinctive qualities. Keep it under 100 words."#,
        name = sample.name,
        duration = sample
            .duration
            .map(|d| format!("{:.2}s", d))
            .unwrap_or_else(|| "unknown".to_string()),
        category = sample.category.as_deref().unwrap_or("unknown"),
        bpm = or_unknown(sample.bpm),
        tags = sample.tags.join(", "),
        mood = sample.mood.as_deref().unwrap_or("unknown"),
        energy = sample.energy.as_deref().unwrap_or("unknown"),
    );

    CompletionRequest {
        system: DESCRIPTION_SYSTEM.to_string(),
        prompt,
        max_tokens: 150,
        temperature: 0.6,
    }
}
