//! Hosted LLM completion providers
//!
//! Both providers implement [`CompletionBackend`]; everything that turns a
//! sample into a prompt and a reply into validated fields lives in
//! [`classify`] and is shared between them.

pub mod anthropic;
pub mod classify;
pub mod openai;
pub mod prompts;
pub mod response_parser;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::{FailureKind, ProviderKind};

pub use anthropic::AnthropicClient;
pub use classify::SampleDescriptor;
pub use openai::OpenAiClient;

/// Provider call errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("API key is not configured")]
    MissingApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Provider rejected credentials (HTTP {0})")]
    Unauthorized(u16),

    #[error("API error {0}: {1}")]
    HttpStatus(u16, String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ProviderError::MissingApiKey => FailureKind::MissingApiKey,
            ProviderError::Network(_) => FailureKind::Network,
            ProviderError::Timeout => FailureKind::Timeout,
            ProviderError::Unauthorized(_) => FailureKind::Unauthorized,
            ProviderError::HttpStatus(status, _) => FailureKind::HttpStatus(*status),
            ProviderError::MalformedResponse(_) => FailureKind::MalformedResponse,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::MalformedResponse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

/// One completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Text completion seam shared by both providers
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Send one request and return the raw reply text
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}

/// Connection settings for one provider client
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub requests_per_minute: u32,
}

pub(crate) type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

pub(crate) fn build_rate_limiter(requests_per_minute: u32) -> DirectRateLimiter {
    let per_minute = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
    RateLimiter::direct(Quota::per_minute(per_minute))
}

pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .user_agent(concat!("ai-sample-organizer/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ProviderError::Network(e.to_string()))
}

/// Send a prepared request and decode the JSON body, mapping HTTP failures
pub(crate) async fn send_json<T: serde::de::DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request.send().await?;
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(ProviderError::Unauthorized(status.as_u16()));
    }
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(ProviderError::HttpStatus(status.as_u16(), error_text));
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ProviderError::MalformedResponse(e.to_string()))
}

/// Configured providers, at most one of each kind
#[derive(Clone, Default)]
pub struct ProviderSet {
    anthropic: Option<Arc<dyn CompletionBackend>>,
    openai: Option<Arc<dyn CompletionBackend>>,
}

impl ProviderSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a backend, replacing any previous backend of the same kind
    pub fn with(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        match backend.kind() {
            ProviderKind::Anthropic => self.anthropic = Some(backend),
            ProviderKind::OpenAi => self.openai = Some(backend),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.anthropic.is_none() && self.openai.is_none()
    }

    pub fn has(&self, kind: ProviderKind) -> bool {
        match kind {
            ProviderKind::Anthropic => self.anthropic.is_some(),
            ProviderKind::OpenAi => self.openai.is_some(),
        }
    }

    pub fn anthropic(&self) -> Option<&Arc<dyn CompletionBackend>> {
        self.anthropic.as_ref()
    }

    pub fn openai(&self) -> Option<&Arc<dyn CompletionBackend>> {
        self.openai.as_ref()
    }

    /// Analysis order: Anthropic (primary) then OpenAI
    pub fn analysis_order(&self) -> Vec<Arc<dyn CompletionBackend>> {
        self.anthropic.iter().chain(self.openai.iter()).cloned().collect()
    }

    /// Search order: OpenAI then Anthropic
    pub fn search_order(&self) -> Vec<Arc<dyn CompletionBackend>> {
        self.openai.iter().chain(self.anthropic.iter()).cloned().collect()
    }
}

impl std::fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSet")
            .field("anthropic", &self.anthropic.is_some())
            .field("openai", &self.openai.is_some())
            .finish()
    }
}
