use axum::{
    extract::{Extension, Path},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::Claims;
use crate::database::{Category, Repository};
use crate::logging::{AuditAction, AuditLog, AuditLogger};
use crate::utils::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CategoryListResponse {
    pub categories: Vec<Category>,
    pub total: usize,
}

pub async fn list_categories_handler(
    Extension(repository): Extension<Arc<Repository>>,
) -> Result<Json<CategoryListResponse>, ApiError> {
    let categories = repository.list_categories().await?;
    let total = categories.len();
    Ok(Json(CategoryListResponse { categories, total }))
}

pub async fn get_category_handler(
    Extension(repository): Extension<Arc<Repository>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Category>, ApiError> {
    let category = repository
        .find_category(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;
    Ok(Json(category))
}

pub async fn create_category_handler(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }

    let category = repository
        .create_category(name, request.description.as_deref())
        .await?;

    audit.log(
        AuditLog::new(AuditAction::Created, "category")
            .actor(claims.user_id)
            .entity_id(category.id),
    );

    Ok(Json(category))
}

pub async fn update_category_handler(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }

    repository
        .find_category(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    let category = repository
        .update_category(id, name, request.description.as_deref())
        .await?;

    audit.log(
        AuditLog::new(AuditAction::Updated, "category")
            .actor(claims.user_id)
            .entity_id(category.id),
    );

    Ok(Json(category))
}

pub async fn delete_category_handler(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !repository.delete_category(id).await? {
        return Err(ApiError::NotFound("Category not found".to_string()));
    }

    audit.log(
        AuditLog::new(AuditAction::Deleted, "category")
            .actor(claims.user_id)
            .entity_id(id),
    );

    Ok(Json(serde_json::json!({ "deleted": true })))
}
