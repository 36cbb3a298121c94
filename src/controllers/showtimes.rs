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
use crate::models::NewShowtime;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/showtimes", get(list_showtimes).post(create_showtime))
        .route(
            "/showtimes/{id}",
            get(get_showtime).put(update_showtime).delete(delete_showtime),
        )
        .route("/showtimes/movie/{movie_id}", get(list_showtimes_for_movie))
}

// GET /api/showtimes
async fn list_showtimes(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog.showtimes(None).await?))
}

// GET /api/showtimes/{id}
async fn get_showtime(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog.showtime(id).await?))
}

// GET /api/showtimes/movie/{movie_id}
async fn list_showtimes_for_movie(
    State(state): State<Arc<AppState>>,
    ApiPath(movie_id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.catalog.movie(movie_id).await?;
    Ok(Json(state.catalog.showtimes(Some(movie_id)).await?))
}

// POST /api/showtimes
async fn create_showtime(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<NewShowtime>,
) -> Result<impl IntoResponse, AppError> {
    user.require_admin()?;
    let showtime = state.catalog.create_showtime(req).await?;
    Ok((StatusCode::CREATED, Json(showtime)))
}

// PUT /api/showtimes/{id}
async fn update_showtime(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<NewShowtime>,
) -> Result<impl IntoResponse, AppError> {
    user.require_admin()?;
    Ok(Json(state.catalog.update_showtime(id, req).await?))
}

// DELETE /api/showtimes/{id}
async fn delete_showtime(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    user.require_admin()?;
    state.catalog.delete_showtime(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
