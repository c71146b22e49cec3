//! Scripted completion backends standing in for hosted providers

use aiso_ai::models::ProviderKind;
use aiso_ai::services::{CompletionBackend, CompletionRequest, ProviderError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Replies by request kind, recognised from the token budget
pub struct ScriptedBackend {
    pub kind: ProviderKind,
    pub categorization: String,
    pub tagging: String,
    pub search: String,
    pub description: String,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            categorization: r#"Sure! {"category":"bass","subcategory":"808","confidence":0.9,"reasoning":"low"}"#
                .to_string(),
            tagging: r#"{"tags":["808","sub"],"mood":"dark","energy":"high","style":"trap","characteristics":["boomy"],"useCase":"drops"}"#
                .to_string(),
            search: r#"{"matches": []}"#.to_string(),
            description: "A deep 808 with a long tail.".to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_search(mut self, reply: &str) -> Self {
        self.search = reply.to_string();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = match request.max_tokens {
            300 => &self.categorization,
            400 => &self.tagging,
            500 => &self.search,
            _ => &self.description,
        };
        Ok(reply.clone())
    }
}

/// Every request times out
pub struct FailingBackend(pub ProviderKind);

#[async_trait]
impl CompletionBackend for FailingBackend {
    fn kind(&self) -> ProviderKind {
        self.0
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<String, ProviderError> {
        Err(ProviderError::Timeout)
    }
}
