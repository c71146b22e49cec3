//! Merge provider outcomes into one analysis
//!
//! - one success: passed through unchanged
//! - two successes: Anthropic is primary for scalar fields, confidence is the
//!   max, tags and characteristics are order-preserving unions
//! - no success: filename keyword fallback at confidence 0.3

use crate::models::{dedup_labels, AiAnalysis, AnalysisSource, ProviderAnalysis, ProviderKind, ProviderOutcome};

/// Confidence assigned to filename keyword categorization
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Keyword → category, first match wins
const FALLBACK_KEYWORDS: &[(&str, &str)] = &[
    ("kick", "kick"),
    ("snare", "snare"),
    ("hihat", "hihat"),
    ("hat", "hihat"),
    ("bass", "bass"),
    ("lead", "lead"),
    ("pad", "pad"),
    ("vocal", "vocal"),
];

/// Combine every provider outcome for one sample
///
/// `name` and `bpm` feed the fallback when no provider succeeded.
pub fn combine(outcomes: Vec<ProviderOutcome>, name: &str, bpm: Option<f64>) -> AiAnalysis {
    let mut successes: Vec<ProviderAnalysis> = outcomes
        .into_iter()
        .filter_map(ProviderOutcome::into_success)
        .collect();
    // Anthropic first
    successes.sort_by_key(|analysis| match analysis.provider {
        ProviderKind::Anthropic => 0,
        ProviderKind::OpenAi => 1,
    });

    let mut successes = successes.into_iter();
    match (successes.next(), successes.next()) {
        (None, _) => fallback_analysis(name, bpm),
        (Some(only), None) => AiAnalysis::from(only),
        (Some(primary), Some(secondary)) => merge(primary, secondary),
    }
}

fn is_blank(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("unknown")
}

fn prefer(primary: String, secondary: String) -> String {
    if is_blank(&primary) && !is_blank(&secondary) {
        secondary
    } else {
        primary
    }
}

/// Merge two successful analyses, `primary` taking precedence
pub fn merge(primary: ProviderAnalysis, secondary: ProviderAnalysis) -> AiAnalysis {
    let sources = vec![
        AnalysisSource::from(primary.provider),
        AnalysisSource::from(secondary.provider),
    ];

    AiAnalysis {
        category: prefer(primary.category, secondary.category),
        subcategory: primary.subcategory.or(secondary.subcategory),
        confidence: primary.confidence.max(secondary.confidence),
        tags: dedup_labels(primary.tags.into_iter().chain(secondary.tags).collect()),
        mood: prefer(primary.mood, secondary.mood),
        energy: prefer(primary.energy, secondary.energy),
        style: prefer(primary.style, secondary.style),
        characteristics: dedup_labels(
            primary
                .characteristics
                .into_iter()
                .chain(secondary.characteristics)
                .collect(),
        ),
        use_case: primary.use_case.or(secondary.use_case),
        sources,
    }
}

/// Category guess from filename keywords, `None` when nothing matches
pub fn fallback_category(name: &str) -> Option<&'static str> {
    let name = name.to_lowercase();
    FALLBACK_KEYWORDS
        .iter()
        .find(|(keyword, _)| name.contains(keyword))
        .map(|(_, category)| *category)
}

/// Energy band from tempo: > 140 high, < 100 low, otherwise medium
pub fn energy_for_bpm(bpm: Option<f64>) -> &'static str {
    match bpm {
        Some(bpm) if bpm > 140.0 => "high",
        Some(bpm) if bpm < 100.0 => "low",
        _ => "medium",
    }
}

/// Analysis used when no provider is configured or all of them failed
pub fn fallback_analysis(name: &str, bpm: Option<f64>) -> AiAnalysis {
    let category = fallback_category(name);

    AiAnalysis {
        category: category.unwrap_or("unknown").to_string(),
        subcategory: None,
        confidence: FALLBACK_CONFIDENCE,
        tags: category.map(|c| vec![c.to_string()]).unwrap_or_default(),
        mood: "neutral".to_string(),
        energy: energy_for_bpm(bpm).to_string(),
        style: "unknown".to_string(),
        characteristics: Vec::new(),
        use_case: None,
        sources: vec![AnalysisSource::Fallback],
    }
}
