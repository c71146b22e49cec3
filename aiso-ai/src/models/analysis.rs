//! Provider replies and combined AI analysis
//!
//! Remote JSON is validated into these types right after parsing; nothing
//! downstream looks at raw provider output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hosted completion provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated categorization reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Categorization {
    pub category: String,
    pub subcategory: Option<String>,
    /// Clamped to 0.0-1.0
    pub confidence: f64,
    pub reasoning: String,
}

/// Validated tagging reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagSuggestion {
    pub tags: Vec<String>,
    pub mood: String,
    pub energy: String,
    pub style: String,
    pub characteristics: Vec<String>,
    pub use_case: Option<String>,
}

impl Default for TagSuggestion {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            mood: "neutral".to_string(),
            energy: "medium".to_string(),
            style: "unknown".to_string(),
            characteristics: Vec::new(),
            use_case: None,
        }
    }
}

/// One provider's full answer for one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderAnalysis {
    pub provider: ProviderKind,
    pub category: String,
    pub subcategory: Option<String>,
    pub confidence: f64,
    pub tags: Vec<String>,
    pub mood: String,
    pub energy: String,
    pub style: String,
    pub characteristics: Vec<String>,
    pub use_case: Option<String>,
}

impl ProviderAnalysis {
    pub fn from_parts(
        provider: ProviderKind,
        categorization: Categorization,
        tagging: TagSuggestion,
    ) -> Self {
        Self {
            provider,
            category: categorization.category,
            subcategory: categorization.subcategory,
            confidence: categorization.confidence,
            tags: tagging.tags,
            mood: tagging.mood,
            energy: tagging.energy,
            style: tagging.style,
            characteristics: tagging.characteristics,
            use_case: tagging.use_case,
        }
    }
}

/// Why a provider produced no usable answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingApiKey,
    Network,
    Timeout,
    Unauthorized,
    HttpStatus(u16),
    MalformedResponse,
}

/// Tagged provider result: either validated fields or a failure kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProviderOutcome {
    Success(ProviderAnalysis),
    Failure {
        provider: ProviderKind,
        kind: FailureKind,
        message: String,
    },
}

impl ProviderOutcome {
    pub fn provider(&self) -> ProviderKind {
        match self {
            ProviderOutcome::Success(analysis) => analysis.provider,
            ProviderOutcome::Failure { provider, .. } => *provider,
        }
    }

    pub fn into_success(self) -> Option<ProviderAnalysis> {
        match self {
            ProviderOutcome::Success(analysis) => Some(analysis),
            ProviderOutcome::Failure { .. } => None,
        }
    }
}

/// Origin of a combined analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisSource {
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
    /// Filename keyword matching, no provider involved
    #[serde(rename = "fallback")]
    Fallback,
}

impl From<ProviderKind> for AnalysisSource {
    fn from(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Anthropic => AnalysisSource::Anthropic,
            ProviderKind::OpenAi => AnalysisSource::OpenAi,
        }
    }
}

/// Categorization and tagging result after combining providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub category: String,
    pub subcategory: Option<String>,
    pub confidence: f64,
    pub tags: Vec<String>,
    pub mood: String,
    pub energy: String,
    pub style: String,
    pub characteristics: Vec<String>,
    pub use_case: Option<String>,
    pub sources: Vec<AnalysisSource>,
}

impl From<ProviderAnalysis> for AiAnalysis {
    fn from(analysis: ProviderAnalysis) -> Self {
        Self {
            category: analysis.category,
            subcategory: analysis.subcategory,
            confidence: analysis.confidence,
            tags: analysis.tags,
            mood: analysis.mood,
            energy: analysis.energy,
            style: analysis.style,
            characteristics: analysis.characteristics,
            use_case: analysis.use_case,
            sources: vec![analysis.provider.into()],
        }
    }
}

impl AiAnalysis {
    pub fn is_fallback(&self) -> bool {
        self.sources == [AnalysisSource::Fallback]
    }
}
