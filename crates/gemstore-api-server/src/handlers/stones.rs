use axum::{
    extract::{Extension, Path},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::parse_status;
use crate::auth::Claims;
use crate::database::{Repository, Stone};
use crate::logging::{AuditAction, AuditLog, AuditLogger};
use crate::utils::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct StoneRequest {
    pub name: String,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StoneListResponse {
    pub stones: Vec<Stone>,
    pub total: usize,
}

pub async fn list_stones_handler(
    Extension(repository): Extension<Arc<Repository>>,
) -> Result<Json<StoneListResponse>, ApiError> {
    let stones = repository.list_stones().await?;
    let total = stones.len();
    Ok(Json(StoneListResponse { stones, total }))
}

pub async fn get_stone_handler(
    Extension(repository): Extension<Arc<Repository>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Stone>, ApiError> {
    let stone = repository
        .find_stone(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Stone not found".to_string()))?;
    Ok(Json(stone))
}

pub async fn create_stone_handler(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<StoneRequest>,
) -> Result<Json<Stone>, ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }
    let status = match request.status.as_deref() {
        Some(s) => parse_status(s)?,
        None => "active".to_string(),
    };

    let stone = repository.create_stone(name, &status).await?;

    audit.log(
        AuditLog::new(AuditAction::Created, "stone")
            .actor(claims.user_id)
            .entity_id(stone.id),
    );

    Ok(Json(stone))
}

pub async fn update_stone_handler(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<StoneRequest>,
) -> Result<Json<Stone>, ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }
    let status = match request.status.as_deref() {
        Some(s) => parse_status(s)?,
        None => "active".to_string(),
    };

    repository
        .find_stone(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Stone not found".to_string()))?;

    let stone = repository.update_stone(id, name, &status).await?;

    audit.log(
        AuditLog::new(AuditAction::Updated, "stone")
            .actor(claims.user_id)
            .entity_id(stone.id),
    );

    Ok(Json(stone))
}

pub async fn delete_stone_handler(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !repository.delete_stone(id).await? {
        return Err(ApiError::NotFound("Stone not found".to_string()));
    }

    audit.log(
        AuditLog::new(AuditAction::Deleted, "stone")
            .actor(claims.user_id)
            .entity_id(id),
    );

    Ok(Json(serde_json::json!({ "deleted": true })))
}
