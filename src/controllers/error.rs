use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::services::{BookingError, CatalogError};
use crate::store::StoreError;

/// Error shape of every `/api` response: `{"error": "<message>"}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Authentication required")]
    Unauthorized,
    /// Detail is logged where it happens; clients only see the status.
    #[error("Internal Server Error")]
    Internal,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        if status == StatusCode::UNAUTHORIZED {
            return (
                status,
                [("WWW-Authenticate", "Basic realm=\"cinema\"")],
                body,
            )
                .into_response();
        }
        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        error!("Storage error: {}", e);
        AppError::Internal
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<BookingError> for AppError {
    fn from(e: BookingError) -> Self {
        match e {
            BookingError::InvalidRequest(_) | BookingError::SeatNotFound(_) => {
                AppError::BadRequest(e.to_string())
            }
            BookingError::SeatUnavailable(_) => AppError::Conflict(e.to_string()),
            BookingError::NotFound(msg) => AppError::NotFound(msg),
            BookingError::Forbidden(msg) => AppError::Forbidden(msg),
            BookingError::Storage(e) => e.into(),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::Invalid(msg) => AppError::BadRequest(msg),
            CatalogError::NotFound(msg) => AppError::NotFound(msg),
            CatalogError::Storage(e) => e.into(),
        }
    }
}
