use axum::{extract::Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::database::User;
use crate::logging::{AuditAction, AuditLog, AuditLogger};
use crate::services::AuthService;
use crate::utils::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserDto,
    pub token: String,
}

pub async fn register_handler(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<UserDto>, ApiError> {
    if request.username.trim().len() < 3 {
        return Err(ApiError::Validation(
            "Username must be at least 3 characters".to_string(),
        ));
    }
    if request.password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let user = auth_service
        .register(request.username.trim(), &request.password)
        .await?;

    audit.log(
        AuditLog::new(AuditAction::Registered, "user")
            .actor(user.id)
            .entity_id(user.id),
    );

    Ok(Json(UserDto::from(&user)))
}

pub async fn login_handler(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    info!("Login attempt for {}", request.username);

    let result = auth_service
        .login(&request.username, &request.password)
        .await?;

    audit.log(
        AuditLog::new(AuditAction::LoggedIn, "user")
            .actor(result.user.id)
            .entity_id(result.user.id),
    );

    Ok(Json(AuthResponse {
        user: UserDto::from(&result.user),
        token: result.token,
    }))
}
