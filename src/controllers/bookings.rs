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
use crate::services::ReserveRequest;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", get(get_user_bookings).post(create_booking))
        .route("/bookings/{id}", get(get_booking).delete(cancel_booking))
        .route("/bookings/admin/all", get(get_all_bookings))
}

// POST /api/bookings
async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<ReserveRequest>,
) -> Result<impl IntoResponse, AppError> {
    let reservation = state.engine.reserve(user.user_id, req).await?;
    state.cache.invalidate_showtime(reservation.booking.showtime_id).await;
    Ok((StatusCode::CREATED, Json(reservation.booking)))
}

// GET /api/bookings
async fn get_user_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.engine.bookings_for_user(user.user_id).await?))
}

// GET /api/bookings/{id}
async fn get_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.engine.owned_booking(user.user_id, id).await?))
}

// DELETE /api/bookings/{id}
async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let cancellation = state.engine.cancel(user.user_id, id).await?;
    state.cache.invalidate_showtime(cancellation.showtime_id).await;
    Ok(Json(cancellation))
}

// GET /api/bookings/admin/all
async fn get_all_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    if !user.role.can_view_all_bookings() {
        return Err(AppError::Forbidden("Admin role required".to_string()));
    }
    Ok(Json(state.engine.all_bookings().await?))
}
