//! Sample API handlers
//!
//! Import, listing, search, edits and per-sample actions.

use aiso_common::events::AisoEvent;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::db::tags::assign_tag;
use crate::error::{ApiError, ApiResult};
use crate::models::{BatchItem, Sample, SampleUpdate, TagAssignment};
use crate::AppState;

/// POST /samples/import request
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub paths: Vec<PathBuf>,
}

/// GET /samples/search query
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// POST /samples/ai-search request
#[derive(Debug, Deserialize)]
pub struct AiSearchRequest {
    pub query: String,
}

/// POST /samples/:id/tags request
#[derive(Debug, Deserialize)]
pub struct AssignTagRequest {
    pub tag: String,
}

/// DELETE /samples/:id response
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

fn sample_updated(state: &AppState, sample_id: Uuid) {
    state.event_bus.emit_lossy(AisoEvent::SampleUpdated {
        sample_id,
        timestamp: chrono::Utc::now(),
    });
}

async fn find_sample(state: &AppState, id: Uuid) -> ApiResult<Sample> {
    state
        .store
        .get_sample(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Sample {}", id)))
}

/// POST /samples/import
///
/// Analyze and store the selected files. Unparseable audio is kept as a
/// minimal record; only files that cannot be stored at all come back as errors.
pub async fn import_samples(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<Json<Vec<BatchItem>>> {
    if request.paths.is_empty() {
        return Err(ApiError::BadRequest("No files selected".to_string()));
    }

    let items = state.ai.import_files(&request.paths).await;
    for item in &items {
        if let BatchItem::Processed(sample) = item {
            sample_updated(&state, sample.id);
        }
    }

    tracing::info!(
        files = request.paths.len(),
        failed = items.iter().filter(|i| i.is_failed()).count(),
        "Files imported"
    );
    Ok(Json(items))
}

/// GET /samples
pub async fn list_samples(State(state): State<AppState>) -> ApiResult<Json<Vec<Sample>>> {
    Ok(Json(state.store.list_samples().await?))
}

/// GET /samples/:id
pub async fn get_sample(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Sample>> {
    Ok(Json(find_sample(&state, id).await?))
}

/// GET /samples/search?q=
pub async fn search_samples(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Sample>>> {
    Ok(Json(state.store.search_samples(&query.q).await?))
}

/// POST /samples/ai-search
///
/// Runs over the whole library; falls back to text matching without providers.
pub async fn ai_search(
    State(state): State<AppState>,
    Json(request): Json<AiSearchRequest>,
) -> ApiResult<Json<Vec<Sample>>> {
    let samples = state.store.list_samples().await?;
    Ok(Json(state.ai.search_samples(&request.query, samples).await))
}

/// PATCH /samples/:id
pub async fn update_sample(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<SampleUpdate>,
) -> ApiResult<Json<Sample>> {
    let sample = state.store.update_sample(id, update).await?;
    sample_updated(&state, sample.id);
    Ok(Json(sample))
}

/// DELETE /samples/:id
pub async fn delete_sample(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeleteResponse>> {
    let deleted = state.store.delete_sample(id).await?;
    if deleted {
        state.event_bus.emit_lossy(AisoEvent::SampleDeleted {
            sample_id: id,
            timestamp: chrono::Utc::now(),
        });
    }
    Ok(Json(DeleteResponse { deleted }))
}

/// POST /samples/:id/tags
pub async fn add_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignTagRequest>,
) -> ApiResult<Json<TagAssignment>> {
    let assignment = assign_tag(state.store.as_ref(), id, &request.tag).await?;
    if assignment.added {
        sample_updated(&state, id);
    }
    Ok(Json(assignment))
}

/// POST /samples/:id/play
pub async fn record_play(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Sample>> {
    let sample = state.store.record_play(id).await?;
    sample_updated(&state, id);
    Ok(Json(sample))
}

/// POST /samples/:id/describe
pub async fn describe_sample(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Sample>> {
    let sample = state.ai.describe_sample(id).await?;
    sample_updated(&state, id);
    Ok(Json(sample))
}

/// GET /samples/category/:category
pub async fn samples_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> ApiResult<Json<Vec<Sample>>> {
    Ok(Json(state.store.samples_by_category(&category).await?))
}

/// GET /samples/tag/:tag
pub async fn samples_by_tag(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> ApiResult<Json<Vec<Sample>>> {
    Ok(Json(state.store.samples_by_tag(&tag).await?))
}

/// Build sample routes
pub fn sample_routes() -> Router<AppState> {
    Router::new()
        .route("/samples", get(list_samples))
        .route("/samples/import", post(import_samples))
        .route("/samples/search", get(search_samples))
        .route("/samples/ai-search", post(ai_search))
        .route("/samples/category/:category", get(samples_by_category))
        .route("/samples/tag/:tag", get(samples_by_tag))
        .route(
            "/samples/:id",
            get(get_sample).patch(update_sample).delete(delete_sample),
        )
        .route("/samples/:id/tags", post(add_tag))
        .route("/samples/:id/play", post(record_play))
        .route("/samples/:id/describe", post(describe_sample))
}
