pub mod bookings;
pub mod error;
pub mod extract;
pub mod movies;
pub mod seats;
pub mod showtimes;
pub mod theaters;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(showtimes::routes())
        .merge(seats::routes())
        .merge(bookings::routes())
        .merge(theaters::routes())
        .merge(movies::routes())
}

/// The full application router, ready to serve.
pub fn router(state: Arc<crate::AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Cinema Booking API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", routes())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
