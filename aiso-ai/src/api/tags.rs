//! Tag and category API handlers

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::tags::{list_categories, list_tags};
use crate::error::ApiResult;
use crate::models::{Category, CustomTag, Tag};
use crate::AppState;

/// POST /tags request
#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    pub color: String,
}

/// GET /categories
pub async fn get_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(list_categories(state.store.as_ref()).await?))
}

/// GET /tags
///
/// System tags from stored samples merged with the user's custom tags.
pub async fn get_tags(State(state): State<AppState>) -> ApiResult<Json<Vec<Tag>>> {
    let custom = state.custom_tags.load();
    Ok(Json(list_tags(state.store.as_ref(), &custom).await?))
}

/// POST /tags
pub async fn create_tag(
    State(state): State<AppState>,
    Json(request): Json<CreateTagRequest>,
) -> ApiResult<(StatusCode, Json<CustomTag>)> {
    let tag = state.custom_tags.create(&request.name, &request.color)?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// Build tag and category routes
pub fn tag_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(get_categories))
        .route("/tags", get(get_tags).post(create_tag))
}
