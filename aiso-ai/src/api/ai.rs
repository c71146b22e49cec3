//! AI provider configuration endpoints
//!
//! Keys passed to `/ai/initialize` are held in memory only.

use aiso_common::events::AisoEvent;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::config::ProviderCredentials;
use crate::services::AiStatus;
use crate::AppState;

/// POST /ai/initialize
///
/// **Request:** `{"openai": "sk-...", "anthropic": "sk-ant-..."}`; either may
/// be absent or blank, which leaves that provider unconfigured.
pub async fn initialize(
    State(state): State<AppState>,
    Json(credentials): Json<ProviderCredentials>,
) -> Json<AiStatus> {
    let status = state.ai.initialize(&credentials);
    state.event_bus.emit_lossy(AisoEvent::AiProvidersChanged {
        openai: status.openai,
        anthropic: status.anthropic,
        timestamp: chrono::Utc::now(),
    });
    Json(status)
}

/// GET /ai/status
pub async fn status(State(state): State<AppState>) -> Json<AiStatus> {
    Json(state.ai.status())
}

/// Build AI routes
pub fn ai_routes() -> Router<AppState> {
    Router::new()
        .route("/ai/initialize", post(initialize))
        .route("/ai/status", get(status))
}
