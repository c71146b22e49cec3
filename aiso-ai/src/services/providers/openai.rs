//! OpenAI chat completions client

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{
    build_http_client, build_rate_limiter, send_json, ClientSettings, CompletionBackend,
    CompletionRequest, DirectRateLimiter, ProviderError,
};
use crate::models::ProviderKind;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4";

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI API client
pub struct OpenAiClient {
    http_client: reqwest::Client,
    rate_limiter: DirectRateLimiter,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ProviderError> {
        if settings.api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey);
        }

        Ok(Self {
            http_client: build_http_client(settings.timeout)?,
            rate_limiter: build_rate_limiter(settings.requests_per_minute),
            api_key: settings.api_key,
            model: settings.model,
            endpoint: format!(
                "{}/v1/chat/completions",
                settings.base_url.trim_end_matches('/')
            ),
        })
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.rate_limiter.until_ready().await;

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt },
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        tracing::debug!(
            model = %self.model,
            max_tokens = request.max_tokens,
            "Sending OpenAI chat completion"
        );

        let completion: ChatCompletion = send_json(
            self.http_client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body),
        )
        .await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::MalformedResponse("reply has no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type Captured = Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>;

    async fn spawn_mock(reply: serde_json::Value) -> (String, Captured) {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(
                "/v1/chat/completions",
                post(
                    |State((captured, reply)): State<(Captured, serde_json::Value)>,
                     headers: HeaderMap,
                     Json(body): Json<serde_json::Value>| async move {
                        let auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        captured.lock().unwrap().push((auth, body));
                        Json(reply)
                    },
                ),
            )
            .with_state((captured.clone(), reply));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), captured)
    }

    fn settings(base_url: String) -> ClientSettings {
        ClientSettings {
            api_key: "sk-test".to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url,
            timeout: Duration::from_secs(5),
            requests_per_minute: 60,
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "system text".to_string(),
            prompt: "user text".to_string(),
            max_tokens: 300,
            temperature: 0.3,
        }
    }

    #[test]
    fn empty_key_is_rejected() {
        let mut settings = settings(DEFAULT_BASE_URL.to_string());
        settings.api_key = "  ".to_string();
        assert!(matches!(OpenAiClient::new(settings), Err(ProviderError::MissingApiKey)));
    }

    #[tokio::test]
    async fn sends_chat_completion_wire_format() {
        let (base_url, captured) = spawn_mock(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "{\"category\":\"kick\"}" } }]
        }))
        .await;

        let client = OpenAiClient::new(settings(format!("{}/", base_url))).unwrap();
        let reply = client.complete(&request()).await.unwrap();
        assert_eq!(reply, "{\"category\":\"kick\"}");

        let captured = captured.lock().unwrap();
        let (auth, body) = &captured[0];
        assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["max_tokens"], 300);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user text");
    }

    #[tokio::test]
    async fn empty_choices_are_malformed() {
        let (base_url, _) = spawn_mock(serde_json::json!({ "choices": [] })).await;
        let client = OpenAiClient::new(settings(base_url)).unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = OpenAiClient::new(settings(format!("http://{}", addr))).unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)), "got {:?}", err);
    }
}
