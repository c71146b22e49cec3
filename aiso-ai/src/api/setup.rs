//! Setup (onboarding) config endpoints

use aiso_common::config::{load_setup_config, save_setup_config, SetupConfig};
use axum::{extract::State, routing::get, Json, Router};

use crate::error::ApiResult;
use crate::AppState;

/// GET /setup
///
/// Defaults when the file is missing or unreadable.
pub async fn get_setup(State(state): State<AppState>) -> Json<SetupConfig> {
    Json(load_setup_config(&state.data_paths.setup_config_path()))
}

/// PUT /setup
///
/// Completing setup without a date stamps the current time.
pub async fn put_setup(
    State(state): State<AppState>,
    Json(mut config): Json<SetupConfig>,
) -> ApiResult<Json<SetupConfig>> {
    if config.setup_completed && config.setup_date.is_none() {
        config.setup_date = Some(chrono::Utc::now());
    }

    save_setup_config(&state.data_paths.setup_config_path(), &config)?;
    tracing::info!(
        setup_completed = config.setup_completed,
        theme = %config.theme,
        "Setup config saved"
    );
    Ok(Json(config))
}

/// Build setup routes
pub fn setup_routes() -> Router<AppState> {
    Router::new().route("/setup", get(get_setup).put(put_setup))
}
