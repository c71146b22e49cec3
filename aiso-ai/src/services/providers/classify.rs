//! Provider-independent classification operations
//!
//! Each operation builds a request from `prompts`, sends it through any
//! [`CompletionBackend`] and validates the reply with `response_parser`.

use super::{prompts, response_parser, CompletionBackend, ProviderError};
use crate::models::{Categorization, ProviderAnalysis, ProviderKind, ProviderOutcome, Sample, TagSuggestion};
use crate::services::heuristic_estimator::HeuristicEstimate;
use crate::services::metadata_extractor::AudioMetadata;

/// What a provider is told about one sample
#[derive(Debug, Clone, PartialEq)]
pub struct SampleDescriptor {
    pub name: String,
    pub duration: Option<f64>,
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
    /// Explicit filename tempo only
    pub bpm: Option<u32>,
}

impl SampleDescriptor {
    pub fn new(metadata: &AudioMetadata, estimate: &HeuristicEstimate) -> Self {
        Self {
            name: metadata.name.clone(),
            duration: metadata.duration_seconds,
            bitrate: metadata.bitrate_kbps,
            sample_rate: metadata.sample_rate,
            channels: metadata.channels,
            bpm: estimate.bpm,
        }
    }
}

/// Pick the category for one sample
pub async fn categorize(
    backend: &dyn CompletionBackend,
    sample: &SampleDescriptor,
) -> Result<Categorization, ProviderError> {
    let reply = backend.complete(&prompts::categorization(sample)).await?;
    response_parser::parse_categorization(&reply)
}

/// Suggest tags, mood, energy, style and characteristics
pub async fn generate_tags(
    backend: &dyn CompletionBackend,
    sample: &SampleDescriptor,
    category: Option<&str>,
) -> Result<TagSuggestion, ProviderError> {
    let reply = backend.complete(&prompts::tagging(sample, category)).await?;
    response_parser::parse_tagging(&reply)
}

/// Categorize and tag concurrently, folding both into one tagged outcome
///
/// A failed categorization fails the whole outcome. A failed tagging call
/// alone degrades to default tags.
pub async fn analyze(backend: &dyn CompletionBackend, sample: &SampleDescriptor) -> ProviderOutcome {
    let provider = backend.kind();
    let (categorization, tagging) = tokio::join!(
        categorize(backend, sample),
        generate_tags(backend, sample, None)
    );

    let categorization = match categorization {
        Ok(categorization) => categorization,
        Err(e) => {
            tracing::warn!(
                provider = %provider,
                sample = %sample.name,
                error = %e,
                "Categorization failed"
            );
            return ProviderOutcome::Failure {
                provider,
                kind: e.kind(),
                message: e.to_string(),
            };
        }
    };

    let tagging = tagging.unwrap_or_else(|e| {
        tracing::warn!(
            provider = %provider,
            sample = %sample.name,
            error = %e,
            "Tag generation failed, using default tags"
        );
        TagSuggestion::default()
    });

    tracing::debug!(
        provider = %provider,
        sample = %sample.name,
        category = %categorization.category,
        confidence = categorization.confidence,
        "Provider analysis complete"
    );

    ProviderOutcome::Success(ProviderAnalysis::from_parts(provider, categorization, tagging))
}

/// Number of library entries offered to a provider for semantic search
pub fn search_candidate_limit(kind: ProviderKind) -> usize {
    match kind {
        ProviderKind::Anthropic => 25,
        ProviderKind::OpenAi => 20,
    }
}

/// Indices into `samples` the provider considers matches for `query`
///
/// Only the first [`search_candidate_limit`] samples are offered. Any
/// failure yields an empty list.
pub async fn search(backend: &dyn CompletionBackend, query: &str, samples: &[Sample]) -> Vec<usize> {
    let limit = search_candidate_limit(backend.kind()).min(samples.len());
    if limit == 0 {
        return Vec::new();
    }
    let candidates = &samples[..limit];

    match backend.complete(&prompts::search(query, candidates)).await {
        Ok(reply) => response_parser::parse_search_matches(&reply, candidates.len()),
        Err(e) => {
            tracing::warn!(provider = %backend.kind(), error = %e, "AI search failed");
            Vec::new()
        }
    }
}

/// Short free-text description; a blank reply is malformed
pub async fn describe(
    backend: &dyn CompletionBackend,
    sample: &Sample,
) -> Result<String, ProviderError> {
    let reply = backend
        .complete(&prompts::description(sample))
        .await
        .inspect_err(|e| {
            tracing::warn!(provider = %backend.kind(), sample = %sample.name, error = %e, "Description failed");
        })?;

    let reply = reply.trim();
    if reply.is_empty() {
        return Err(ProviderError::MalformedResponse("empty description".to_string()));
    }
    Ok(reply.to_string())
}
