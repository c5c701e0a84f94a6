use axum::{
    extract::{Extension, Path},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::parse_status;
use crate::auth::Claims;
use crate::database::{Repository, Store};
use crate::logging::{AuditAction, AuditLog, AuditLogger};
use crate::utils::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct StoreRequest {
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StoreListResponse {
    pub stores: Vec<Store>,
    pub total: usize,
}

pub async fn list_stores_handler(
    Extension(repository): Extension<Arc<Repository>>,
) -> Result<Json<StoreListResponse>, ApiError> {
    let stores = repository.list_stores().await?;
    let total = stores.len();
    Ok(Json(StoreListResponse { stores, total }))
}

pub async fn get_store_handler(
    Extension(repository): Extension<Arc<Repository>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Store>, ApiError> {
    let store = repository
        .find_store(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Store not found".to_string()))?;
    Ok(Json(store))
}

pub async fn create_store_handler(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<StoreRequest>,
) -> Result<Json<Store>, ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }
    let address = request.address.trim();
    if address.is_empty() {
        return Err(ApiError::Validation("address is required".to_string()));
    }
    let status = match request.status.as_deref() {
        Some(s) => parse_status(s)?,
        None => "active".to_string(),
    };

    let store = repository
        .create_store(name, address, request.phone.as_deref(), &status)
        .await?;

    audit.log(
        AuditLog::new(AuditAction::Created, "store")
            .actor(claims.user_id)
            .entity_id(store.id),
    );

    Ok(Json(store))
}

pub async fn update_store_handler(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<StoreRequest>,
) -> Result<Json<Store>, ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }
    let address = request.address.trim();
    if address.is_empty() {
        return Err(ApiError::Validation("address is required".to_string()));
    }
    let status = match request.status.as_deref() {
        Some(s) => parse_status(s)?,
        None => "active".to_string(),
    };

    repository
        .find_store(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Store not found".to_string()))?;

    let store = repository
        .update_store(id, name, address, request.phone.as_deref(), &status)
        .await?;

    audit.log(
        AuditLog::new(AuditAction::Updated, "store")
            .actor(claims.user_id)
            .entity_id(store.id),
    );

    Ok(Json(store))
}

pub async fn delete_store_handler(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !repository.delete_store(id).await? {
        return Err(ApiError::NotFound("Store not found".to_string()));
    }

    audit.log(
        AuditLog::new(AuditAction::Deleted, "store")
            .actor(claims.user_id)
            .entity_id(id),
    );

    Ok(Json(serde_json::json!({ "deleted": true })))
}
