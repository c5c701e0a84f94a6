use axum::{
    extract::{Extension, Path},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::parse_status;
use crate::auth::Claims;
use crate::database::{Repository, Vendor};
use crate::logging::{AuditAction, AuditLog, AuditLogger};
use crate::utils::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateVendorRequest {
    pub first_name: String,
    pub last_name: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVendorRequest {
    pub first_name: String,
    pub last_name: Option<String>,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct VendorStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct VendorListResponse {
    pub vendors: Vec<Vendor>,
    pub total: usize,
}

pub async fn list_vendors_handler(
    Extension(repository): Extension<Arc<Repository>>,
) -> Result<Json<VendorListResponse>, ApiError> {
    let vendors = repository.list_vendors().await?;
    let total = vendors.len();
    Ok(Json(VendorListResponse { vendors, total }))
}

pub async fn get_vendor_handler(
    Extension(repository): Extension<Arc<Repository>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vendor>, ApiError> {
    let vendor = repository
        .find_vendor(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Vendor not found".to_string()))?;
    Ok(Json(vendor))
}

pub async fn create_vendor_handler(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateVendorRequest>,
) -> Result<Json<Vendor>, ApiError> {
    let first_name = request.first_name.trim();
    if first_name.is_empty() {
        return Err(ApiError::Validation("first_name is required".to_string()));
    }

    let status = match request.status.as_deref() {
        Some(s) => parse_status(s)?,
        None => "active".to_string(),
    };

    let vendor = repository
        .create_vendor(first_name, request.last_name.as_deref(), &status)
        .await?;

    audit.log(
        AuditLog::new(AuditAction::Created, "vendor")
            .actor(claims.user_id)
            .entity_id(vendor.id),
    );

    Ok(Json(vendor))
}

pub async fn update_vendor_handler(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateVendorRequest>,
) -> Result<Json<Vendor>, ApiError> {
    let first_name = request.first_name.trim();
    if first_name.is_empty() {
        return Err(ApiError::Validation("first_name is required".to_string()));
    }
    let status = parse_status(&request.status)?;

    repository
        .find_vendor(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Vendor not found".to_string()))?;

    let vendor = repository
        .update_vendor(id, first_name, request.last_name.as_deref(), &status)
        .await?;

    audit.log(
        AuditLog::new(AuditAction::Updated, "vendor")
            .actor(claims.user_id)
            .entity_id(vendor.id),
    );

    Ok(Json(vendor))
}

/// Vendors are never hard-deleted; their status is toggled instead.
pub async fn set_vendor_status_handler(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<VendorStatusRequest>,
) -> Result<Json<Vendor>, ApiError> {
    let status = parse_status(&request.status)?;

    repository
        .find_vendor(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Vendor not found".to_string()))?;

    let vendor = repository.set_vendor_status(id, &status).await?;

    audit.log(
        AuditLog::new(AuditAction::StatusChanged, "vendor")
            .actor(claims.user_id)
            .entity_id(vendor.id)
            .detail(status),
    );

    Ok(Json(vendor))
}
