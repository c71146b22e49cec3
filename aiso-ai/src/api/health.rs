//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::db::StorageKind;
use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" when samples are only kept in memory
    pub status: String,
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Source revision stamped by the build script
    pub revision: String,
    pub uptime_seconds: u64,
    pub storage: StorageKind,
    /// Why storage is ephemeral
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_warning: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let storage = state.store.kind();
    let status = match storage {
        StorageKind::Durable => "ok",
        StorageKind::Ephemeral => "degraded",
    };

    Json(HealthResponse {
        status: status.to_string(),
        module: "aiso-ai".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        revision: env!("GIT_HASH").to_string(),
        uptime_seconds,
        storage,
        storage_warning: state.storage_warning.clone(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
