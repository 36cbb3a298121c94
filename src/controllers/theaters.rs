use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::error::AppError;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::AuthUser;
use crate::models::NewTheater;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/theaters", get(list_theaters).post(create_theater))
        .route("/theaters/search", get(search_theaters))
        .route("/theaters/count", get(count_theaters))
        .route(
            "/theaters/{id}",
            get(get_theater).put(update_theater).delete(delete_theater),
        )
        .route("/theaters/{id}/active", patch(set_theater_active))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TheaterQuery {
    #[serde(default)]
    active_only: bool,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ActiveRequest {
    active: bool,
}

// GET /api/theaters?activeOnly=true
async fn list_theaters(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<TheaterQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog.theaters(query.active_only).await?))
}

// GET /api/theaters/{id}
async fn get_theater(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog.theater(id).await?))
}

// GET /api/theaters/search?name=hall
async fn search_theaters(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog.search_theaters(&query.name).await?))
}

// GET /api/theaters/count
// Только активные залы
async fn count_theaters(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let count = state.catalog.count_active_theaters().await?;
    Ok(Json(json!({ "count": count })))
}

// POST /api/theaters
async fn create_theater(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<NewTheater>,
) -> Result<impl IntoResponse, AppError> {
    user.require_admin()?;
    let theater = state.catalog.create_theater(req).await?;
    Ok((StatusCode::CREATED, Json(theater)))
}

// PATCH /api/theaters/{id}/active
async fn set_theater_active(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<ActiveRequest>,
) -> Result<impl IntoResponse, AppError> {
    user.require_admin()?;
    Ok(Json(state.catalog.set_theater_active(id, req.active).await?))
}

// PUT /api/theaters/{id}
async fn update_theater(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<NewTheater>,
) -> Result<impl IntoResponse, AppError> {
    user.require_admin()?;
    Ok(Json(state.catalog.update_theater(id, req).await?))
}

// DELETE /api/theaters/{id}
// Удаляет и все сеансы зала вместе с местами и бронями
async fn delete_theater(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    user.require_admin()?;
    state.catalog.delete_theater(id).await?;
    Ok(Json(json!({ "message": "Theater deleted successfully" })))
}
