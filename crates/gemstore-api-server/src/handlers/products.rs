use axum::{
    extract::{Extension, Multipart, Path},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::parse_status;
use crate::auth::Claims;
use crate::config::Settings;
use crate::database::{Product, Repository};
use crate::logging::{AuditAction, AuditLog, AuditLogger};
use crate::services::product_service::{ProductInput, UploadedImage};
use crate::services::ProductService;
use crate::utils::error::ApiError;

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<Product>,
    pub total: usize,
}

/// Accumulated multipart form for product create/update. Every text field is
/// optional here; requiredness is decided by the handler.
#[derive(Default)]
struct ProductForm {
    name: Option<String>,
    description: Option<String>,
    price: Option<Decimal>,
    quantity: Option<i32>,
    category_id: Option<Uuid>,
    stone_id: Option<Uuid>,
    vendor_id: Option<Uuid>,
    status: Option<String>,
    existing_images: Option<Vec<String>>,
    images: Vec<UploadedImage>,
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    let name = field.name().unwrap_or("").to_string();
    field
        .text()
        .await
        .map_err(|e| ApiError::Validation(format!("Invalid field {}: {}", name, e)))
}

/// Parse the multipart form, enforcing the upload policy: at most
/// `max_files` files, each an image by magic bytes, each within the
/// per-file size cap.
async fn read_product_form(
    mut multipart: Multipart,
    settings: &Settings,
) -> Result<ProductForm, ApiError> {
    let mut form = ProductForm::default();
    let uploads = &settings.uploads;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Failed to read field: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "images" => {
                if form.images.len() >= uploads.max_files {
                    return Err(ApiError::Validation(format!(
                        "At most {} images are allowed",
                        uploads.max_files
                    )));
                }
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Failed to read file: {}", e)))?
                    .to_vec();
                if data.len() > uploads.max_file_size_bytes {
                    return Err(ApiError::Validation(format!(
                        "Image exceeds the {} byte limit",
                        uploads.max_file_size_bytes
                    )));
                }
                let kind = infer::get(&data).ok_or_else(|| {
                    ApiError::Validation("Unrecognized image format".to_string())
                })?;
                if kind.matcher_type() != infer::MatcherType::Image {
                    return Err(ApiError::Validation(format!(
                        "Only image uploads are allowed, got {}",
                        kind.mime_type()
                    )));
                }
                form.images.push(UploadedImage {
                    extension: kind.extension().to_string(),
                    data,
                });
            }
            "existing_images" => {
                let text = read_text_field(field).await?;
                let list: Vec<String> = serde_json::from_str(&text).map_err(|_| {
                    ApiError::Validation("Malformed existing_images JSON".to_string())
                })?;
                form.existing_images = Some(list);
            }
            "name" => form.name = Some(read_text_field(field).await?),
            "description" => form.description = Some(read_text_field(field).await?),
            "price" => {
                let text = read_text_field(field).await?;
                form.price = Some(text.parse::<Decimal>().map_err(|_| {
                    ApiError::Validation("price must be a decimal number".to_string())
                })?);
            }
            "quantity" => {
                let text = read_text_field(field).await?;
                form.quantity = Some(text.parse::<i32>().map_err(|_| {
                    ApiError::Validation("quantity must be an integer".to_string())
                })?);
            }
            "category_id" => form.category_id = Some(parse_uuid_field(&field_name, field).await?),
            "stone_id" => form.stone_id = Some(parse_uuid_field(&field_name, field).await?),
            "vendor_id" => form.vendor_id = Some(parse_uuid_field(&field_name, field).await?),
            "status" => {
                let text = read_text_field(field).await?;
                form.status = Some(parse_status(&text)?);
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn parse_uuid_field(
    name: &str,
    field: axum::extract::multipart::Field<'_>,
) -> Result<Uuid, ApiError> {
    let text = read_text_field(field).await?;
    Uuid::parse_str(text.trim())
        .map_err(|_| ApiError::Validation(format!("{} must be a UUID", name)))
}

fn into_input(form: &ProductForm) -> Result<ProductInput, ApiError> {
    let name = form
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("name is required".to_string()))?;
    let price = form
        .price
        .ok_or_else(|| ApiError::Validation("price is required".to_string()))?;
    let category_id = form
        .category_id
        .ok_or_else(|| ApiError::Validation("category_id is required".to_string()))?;
    let vendor_id = form
        .vendor_id
        .ok_or_else(|| ApiError::Validation("vendor_id is required".to_string()))?;

    Ok(ProductInput {
        name: name.to_string(),
        description: form.description.clone().unwrap_or_default(),
        price,
        quantity: form.quantity.unwrap_or(0),
        category_id,
        stone_id: form.stone_id,
        vendor_id,
        status: form.status.clone().unwrap_or_else(|| "active".to_string()),
    })
}

pub async fn list_products_handler(
    Extension(repository): Extension<Arc<Repository>>,
) -> Result<Json<ProductListResponse>, ApiError> {
    let products = repository.list_products().await?;
    let total = products.len();
    Ok(Json(ProductListResponse { products, total }))
}

pub async fn get_product_handler(
    Extension(repository): Extension<Arc<Repository>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    let product = repository
        .find_product(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;
    Ok(Json(product))
}

pub async fn create_product_handler(
    Extension(product_service): Extension<Arc<ProductService>>,
    Extension(settings): Extension<Settings>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<Json<Product>, ApiError> {
    let form = read_product_form(multipart, &settings).await?;
    let input = into_input(&form)?;

    info!(
        "Creating product '{}' with {} images",
        input.name,
        form.images.len()
    );

    let product = product_service.create(input, form.images).await?;

    audit.log(
        AuditLog::new(AuditAction::Created, "product")
            .actor(claims.user_id)
            .entity_id(product.id)
            .detail(product.sku.clone()),
    );

    Ok(Json(product))
}

pub async fn update_product_handler(
    Extension(product_service): Extension<Arc<ProductService>>,
    Extension(settings): Extension<Settings>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<Product>, ApiError> {
    let form = read_product_form(multipart, &settings).await?;
    let input = into_input(&form)?;

    let product = product_service
        .update(id, input, form.existing_images.clone(), form.images)
        .await?;

    audit.log(
        AuditLog::new(AuditAction::Updated, "product")
            .actor(claims.user_id)
            .entity_id(product.id),
    );

    Ok(Json(product))
}

pub async fn delete_product_handler(
    Extension(product_service): Extension<Arc<ProductService>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    product_service.delete(id).await?;

    audit.log(
        AuditLog::new(AuditAction::Deleted, "product")
            .actor(claims.user_id)
            .entity_id(id),
    );

    Ok(Json(serde_json::json!({ "deleted": true })))
}
