use chrono::Utc;
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::settings::UploadConfig;
use crate::database::{Product, Repository};
use crate::services::SkuService;
use crate::utils::error::ApiError;

/// Allocation and insert race under concurrent creates for the same vendor
/// prefix; the unique index rejects the loser, which re-allocates.
const MAX_SKU_ATTEMPTS: usize = 3;

/// An uploaded image already validated at the HTTP boundary (size, count,
/// sniffed type), ready to be written to disk.
pub struct UploadedImage {
    pub extension: String,
    pub data: Vec<u8>,
}

pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub quantity: i32,
    pub category_id: Uuid,
    pub stone_id: Option<Uuid>,
    pub vendor_id: Uuid,
    pub status: String,
}

pub struct ProductService {
    repository: Arc<Repository>,
    sku_service: Arc<SkuService>,
    uploads: UploadConfig,
}

impl ProductService {
    pub fn new(
        repository: Arc<Repository>,
        sku_service: Arc<SkuService>,
        uploads: UploadConfig,
    ) -> Self {
        Self {
            repository,
            sku_service,
            uploads,
        }
    }

    /// Persist images, allocate a SKU and insert. The SKU is assigned here
    /// exactly once; updates never touch it.
    pub async fn create(
        &self,
        input: ProductInput,
        images: Vec<UploadedImage>,
    ) -> Result<Product, ApiError> {
        self.check_references(&input).await?;

        let filenames = self.store_images(images).await?;

        let mut last_conflict = None;
        for attempt in 1..=MAX_SKU_ATTEMPTS {
            let sku = self.sku_service.allocate(input.vendor_id).await?;
            let now = Utc::now();
            let product = Product {
                id: Uuid::new_v4(),
                name: input.name.clone(),
                description: input.description.clone(),
                price: input.price,
                quantity: input.quantity,
                category_id: input.category_id,
                stone_id: input.stone_id,
                vendor_id: input.vendor_id,
                status: input.status.clone(),
                images: filenames.clone(),
                sku,
                created_at: now,
                updated_at: now,
            };

            match self.repository.insert_product(&product).await {
                Ok(created) => {
                    info!("Product created: {} (sku {})", created.id, created.sku);
                    return Ok(created);
                }
                Err(ApiError::Conflict(msg)) => {
                    warn!(
                        "SKU conflict on attempt {}/{}: {}",
                        attempt, MAX_SKU_ATTEMPTS, msg
                    );
                    last_conflict = Some(ApiError::Conflict(msg));
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_conflict
            .unwrap_or_else(|| ApiError::InternalError("SKU allocation failed".to_string())))
    }

    /// Replace the product's fields and image list. `existing_images` is the
    /// client's kept-filenames list (omitting it keeps the current list);
    /// freshly uploaded files are appended.
    pub async fn update(
        &self,
        id: Uuid,
        input: ProductInput,
        existing_images: Option<Vec<String>>,
        new_images: Vec<UploadedImage>,
    ) -> Result<Product, ApiError> {
        let current = self
            .repository
            .find_product(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

        self.check_references(&input).await?;

        let mut images = existing_images.unwrap_or_else(|| current.images.clone());
        images.extend(self.store_images(new_images).await?);

        let product = Product {
            id: current.id,
            name: input.name,
            description: input.description,
            price: input.price,
            quantity: input.quantity,
            category_id: input.category_id,
            stone_id: input.stone_id,
            vendor_id: input.vendor_id,
            status: input.status,
            images,
            sku: current.sku,
            created_at: current.created_at,
            updated_at: Utc::now(),
        };

        self.repository.update_product(&product).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        if !self.repository.delete_product(id).await? {
            return Err(ApiError::NotFound("Product not found".to_string()));
        }
        info!("Product deleted: {}", id);
        Ok(())
    }

    /// Referenced rows must exist so callers get a 404 instead of a raw
    /// foreign-key failure, and before any image hits the disk. SKU
    /// allocation re-checks the vendor as part of its own contract.
    async fn check_references(&self, input: &ProductInput) -> Result<(), ApiError> {
        self.repository
            .find_vendor(input.vendor_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Vendor not found".to_string()))?;

        self.repository
            .find_category(input.category_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

        if let Some(stone_id) = input.stone_id {
            self.repository
                .find_stone(stone_id)
                .await?
                .ok_or_else(|| ApiError::NotFound("Stone not found".to_string()))?;
        }

        Ok(())
    }

    async fn store_images(&self, images: Vec<UploadedImage>) -> Result<Vec<String>, ApiError> {
        if images.is_empty() {
            return Ok(Vec::new());
        }

        tokio::fs::create_dir_all(&self.uploads.dir)
            .await
            .map_err(|e| {
                ApiError::InternalError(format!("Failed to create uploads dir: {}", e))
            })?;

        let mut filenames = Vec::with_capacity(images.len());
        for image in images {
            let filename = format!("{}.{}", Uuid::new_v4(), image.extension);
            let path = Path::new(&self.uploads.dir).join(&filename);
            tokio::fs::write(&path, &image.data)
                .await
                .map_err(|e| ApiError::InternalError(format!("Failed to store image: {}", e)))?;
            filenames.push(filename);
        }

        Ok(filenames)
    }
}
