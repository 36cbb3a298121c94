use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;

use super::error::AppError;
use super::extract::ApiPath;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/seats/showtime/{id}", get(get_seats))
        .route("/seats/available/showtime/{id}", get(get_available_seats))
}

// GET /api/seats/showtime/{id}
// Первое обращение создаёт места сеанса
async fn get_seats(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let showtime = state.catalog.showtime_context(id).await?;
    let snapshot = state.engine.availability().snapshot(&showtime).await?;
    Ok(Json(snapshot))
}

// GET /api/seats/available/showtime/{id}
async fn get_available_seats(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let showtime = state.catalog.showtime_context(id).await?;
    Ok(Json(state.engine.availability().available_seats(&showtime).await?))
}
