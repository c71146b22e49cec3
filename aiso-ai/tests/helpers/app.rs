//! Application state builders for HTTP and pipeline tests

use aiso_ai::config::ServiceSettings;
use aiso_ai::db::open_store;
use aiso_ai::services::{AiService, ProviderSet};
use aiso_ai::{build_router, AppState};
use aiso_common::config::DataPaths;
use aiso_common::events::EventBus;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// App state over a SQLite store in a temp root folder
///
/// The TempDir must outlive the state.
pub async fn test_state(providers: ProviderSet) -> (TempDir, AppState) {
    let dir = TempDir::new().expect("temp dir");
    let data_paths = DataPaths::new(dir.path().join("data"));
    data_paths.ensure_directory_exists().expect("root folder");

    let opened = open_store(&data_paths.database_path()).await;
    let ai = Arc::new(
        AiService::new(Arc::clone(&opened.store), ServiceSettings::default()).with_providers(providers),
    );
    let state = AppState::new(opened, ai, EventBus::new(100), data_paths);
    (dir, state)
}

/// Send one request through a fresh router; returns status and JSON body
pub async fn send(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let app: Router = build_router(state.clone());

    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, json)
}
