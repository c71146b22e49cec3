//! aiso-ai library interface
//!
//! Sample import, AI categorization, storage and the HTTP/SSE surface the
//! desktop front end talks to.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use aiso_common::config::DataPaths;
use aiso_common::events::EventBus;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::db::tags::CustomTagFile;
use crate::db::{OpenedStore, SampleStore};
use crate::services::AiService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Sample store selected at startup (durable or ephemeral)
    pub store: Arc<dyn SampleStore>,
    /// Set when the durable store could not be opened
    pub storage_warning: Option<String>,
    pub ai: Arc<AiService>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    pub data_paths: DataPaths,
    pub custom_tags: CustomTagFile,
    /// Running batch and its cancellation token, if any
    pub active_batch: Arc<RwLock<Option<api::batch::ActiveBatch>>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(opened: OpenedStore, ai: Arc<AiService>, event_bus: EventBus, data_paths: DataPaths) -> Self {
        Self {
            store: opened.store,
            storage_warning: opened.warning,
            ai,
            event_bus,
            custom_tags: CustomTagFile::new(data_paths.custom_tags_path()),
            data_paths,
            active_batch: Arc::new(RwLock::new(None)),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::health_routes())
        .merge(api::sample_routes())
        .merge(api::tag_routes())
        .merge(api::ai_routes())
        .merge(api::batch_routes())
        .merge(api::setup_routes())
        .route("/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
