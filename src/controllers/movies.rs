use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use super::error::AppError;
use super::extract::{ApiJson, ApiPath};
use crate::middleware::AuthUser;
use crate::models::NewMovie;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movies", get(list_movies).post(create_movie))
        .route(
            "/movies/{id}",
            get(get_movie).put(update_movie).delete(delete_movie),
        )
}

// GET /api/movies
async fn list_movies(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog.movies().await?))
}

// GET /api/movies/{id}
async fn get_movie(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog.movie(id).await?))
}

// POST /api/movies
async fn create_movie(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<NewMovie>,
) -> Result<impl IntoResponse, AppError> {
    user.require_admin()?;
    let movie = state.catalog.create_movie(req).await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

// PUT /api/movies/{id}
async fn update_movie(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<NewMovie>,
) -> Result<impl IntoResponse, AppError> {
    user.require_admin()?;
    Ok(Json(state.catalog.update_movie(id, req).await?))
}

// DELETE /api/movies/{id}
// Каскадом удаляет сеансы фильма
async fn delete_movie(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    user.require_admin()?;
    state.catalog.delete_movie(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
