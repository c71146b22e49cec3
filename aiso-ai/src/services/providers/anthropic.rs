//! Anthropic messages client

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{
    build_http_client, build_rate_limiter, send_json, ClientSettings, CompletionBackend,
    CompletionRequest, DirectRateLimiter, ProviderError,
};
use crate::models::ProviderKind;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type", default)]
    kind: String,
    text: Option<String>,
}

/// Anthropic API client
pub struct AnthropicClient {
    http_client: reqwest::Client,
    rate_limiter: DirectRateLimiter,
    api_key: String,
    model: String,
    endpoint: String,
}

impl AnthropicClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ProviderError> {
        if settings.api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey);
        }

        Ok(Self {
            http_client: build_http_client(settings.timeout)?,
            rate_limiter: build_rate_limiter(settings.requests_per_minute),
            api_key: settings.api_key,
            model: settings.model,
            endpoint: format!("{}/v1/messages", settings.base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl CompletionBackend for AnthropicClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.rate_limiter.until_ready().await;

        let body = json!({
            "model": self.model,
            "system": request.system,
            "messages": [{ "role": "user", "content": request.prompt }],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        tracing::debug!(
            model = %self.model,
            max_tokens = request.max_tokens,
            "Sending Anthropic message"
        );

        let response: MessagesResponse = send_json(
            self.http_client
                .post(&self.endpoint)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .json(&body),
        )
        .await?;

        response
            .content
            .into_iter()
            .filter(|block| block.kind.is_empty() || block.kind == "text")
            .find_map(|block| block.text)
            .ok_or_else(|| ProviderError::MalformedResponse("reply has no text block".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
        routing::post,
        Json, Router,
    };
    use std::time::Duration;

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn settings(base_url: String, timeout: Duration) -> ClientSettings {
        ClientSettings {
            api_key: "ak-test".to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url,
            timeout,
            requests_per_minute: 60,
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "be terse".to_string(),
            prompt: "categorize".to_string(),
            max_tokens: 300,
            temperature: 0.3,
        }
    }

    #[tokio::test]
    async fn sends_messages_wire_format() {
        let app = Router::new().route(
            "/v1/messages",
            post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                let header = |name: &str| {
                    headers
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string()
                };
                if header("x-api-key") != "ak-test" || header("anthropic-version") != API_VERSION {
                    return StatusCode::BAD_REQUEST.into_response();
                }
                if body["system"] != "be terse" || body["messages"][0]["role"] != "user" {
                    return StatusCode::BAD_REQUEST.into_response();
                }
                Json(serde_json::json!({
                    "content": [
                        { "type": "text", "text": "{\"category\":\"snare\"}" }
                    ]
                }))
                .into_response()
            }),
        );
        let base_url = spawn(app).await;

        let client = AnthropicClient::new(settings(base_url, Duration::from_secs(5))).unwrap();
        let reply = client.complete(&request()).await.unwrap();
        assert_eq!(reply, "{\"category\":\"snare\"}");
    }

    #[tokio::test]
    async fn rejected_key_is_unauthorized() {
        let app = Router::new().route(
            "/v1/messages",
            post(|| async { (StatusCode::UNAUTHORIZED, "invalid x-api-key") }),
        );
        let base_url = spawn(app).await;

        let client = AnthropicClient::new(settings(base_url, Duration::from_secs(5))).unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unauthorized(401)));
    }

    #[tokio::test]
    async fn server_error_keeps_status() {
        let app = Router::new().route(
            "/v1/messages",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "overloaded") }),
        );
        let base_url = spawn(app).await;

        let client = AnthropicClient::new(settings(base_url, Duration::from_secs(5))).unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::HttpStatus(503, ref body) if body == "overloaded"));
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let app = Router::new().route(
            "/v1/messages",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(serde_json::json!({ "content": [] }))
            }),
        );
        let base_url = spawn(app).await;

        let client = AnthropicClient::new(settings(base_url, Duration::from_millis(200))).unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout), "got {:?}", err);
    }
}
