//! Batch processing endpoints
//!
//! POST /batch starts a background batch and returns immediately; progress is
//! reported over SSE. POST /batch/cancel stops it between files.

use aiso_common::events::AisoEvent;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{BatchOptions, BatchReport};
use crate::AppState;

/// Handle on the running batch
#[derive(Debug, Clone)]
pub struct ActiveBatch {
    pub batch_id: Uuid,
    pub cancel: CancellationToken,
}

/// POST /batch request
#[derive(Debug, Deserialize)]
pub struct StartBatchRequest {
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub require_ai: bool,
}

/// POST /batch response
#[derive(Debug, Serialize)]
pub struct StartBatchResponse {
    pub batch_id: Uuid,
    pub total: usize,
}

/// POST /batch/cancel response
#[derive(Debug, Serialize)]
pub struct CancelBatchResponse {
    pub batch_id: Uuid,
    pub cancelled: bool,
}

/// POST /batch
///
/// **Errors:**
/// - 409 Conflict: a batch is already running
/// - 503 Service Unavailable: `require_ai` with no provider configured
pub async fn start_batch(
    State(state): State<AppState>,
    Json(request): Json<StartBatchRequest>,
) -> ApiResult<(StatusCode, Json<StartBatchResponse>)> {
    let permit = state.ai.begin_batch(BatchOptions {
        require_ai: request.require_ai,
    })?;

    let batch_id = permit.batch_id();
    let total = request.paths.len();
    let cancel = CancellationToken::new();
    *state.active_batch.write().await = Some(ActiveBatch {
        batch_id,
        cancel: cancel.clone(),
    });

    state.event_bus.emit_lossy(AisoEvent::BatchStarted {
        batch_id,
        total,
        timestamp: chrono::Utc::now(),
    });

    let task_state = state.clone();
    tokio::spawn(async move {
        let event_bus = task_state.event_bus.clone();
        let on_progress = move |progress: crate::models::BatchProgress| {
            let result = serde_json::to_value(&progress.result).unwrap_or(serde_json::Value::Null);
            event_bus.emit_lossy(AisoEvent::BatchProgress {
                batch_id,
                current: progress.current,
                total: progress.total,
                percentage: progress.percentage,
                current_file: progress.current_file,
                result,
                timestamp: chrono::Utc::now(),
            });
        };

        let report = task_state
            .ai
            .process_batch(permit, &request.paths, &cancel, on_progress)
            .await;

        finish_batch(&task_state, &report).await;
    });

    Ok((StatusCode::ACCEPTED, Json(StartBatchResponse { batch_id, total })))
}

async fn finish_batch(state: &AppState, report: &BatchReport) {
    {
        let mut active = state.active_batch.write().await;
        if active.as_ref().is_some_and(|a| a.batch_id == report.batch_id) {
            *active = None;
        }
    }

    let event = if report.cancelled {
        AisoEvent::BatchCancelled {
            batch_id: report.batch_id,
            processed: report.results.len(),
            total: report.total,
            timestamp: chrono::Utc::now(),
        }
    } else {
        AisoEvent::BatchCompleted {
            batch_id: report.batch_id,
            processed: report.results.len() - report.failed_count(),
            failed: report.failed_count(),
            timestamp: chrono::Utc::now(),
        }
    };
    state.event_bus.emit_lossy(event);
}

/// POST /batch/cancel
pub async fn cancel_batch(State(state): State<AppState>) -> ApiResult<Json<CancelBatchResponse>> {
    let active = state
        .active_batch
        .read()
        .await
        .clone()
        .ok_or_else(|| ApiError::NotFound("No batch is running".to_string()))?;

    active.cancel.cancel();
    tracing::info!(batch_id = %active.batch_id, "Batch cancellation requested");

    Ok(Json(CancelBatchResponse {
        batch_id: active.batch_id,
        cancelled: true,
    }))
}

/// Build batch routes
pub fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/batch", post(start_batch))
        .route("/batch/cancel", post(cancel_batch))
}
