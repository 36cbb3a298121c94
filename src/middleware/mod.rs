use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;
use tracing::{debug, error};

use crate::controllers::error::AppError;
use crate::models::Role;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role.can_manage_catalog() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin role required".to_string()))
        }
    }
}

// Basic "username:password" из заголовка Authorization
fn credentials(parts: &Parts) -> Option<(String, String)> {
    let encoded = parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Basic ")?;
    let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (username, password) = credentials.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

// Basic Auth extractor
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let (username, password) = credentials(parts).ok_or(AppError::Unauthorized)?;

        let user = state
            .store
            .user_by_username(&username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        // bcrypt нагружает CPU, уводим с async-потока
        let hash = user.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| {
                error!("Password check task failed: {}", e);
                AppError::Internal
            })?
            .unwrap_or(false);
        if !verified {
            debug!("Rejected credentials for {}", username);
            return Err(AppError::Unauthorized);
        }

        Ok(AuthUser {
            user_id: user.id,
            username: user.username,
            role: user.role,
        })
    }
}
