use axum::{extract::Extension, Json};
use std::sync::Arc;

use crate::database::{DashboardSummary, Repository};
use crate::utils::error::ApiError;

pub async fn summary_handler(
    Extension(repository): Extension<Arc<Repository>>,
) -> Result<Json<DashboardSummary>, ApiError> {
    let summary = DashboardSummary {
        products: repository.count_table("products").await?,
        vendors: repository.count_table("vendors").await?,
        stones: repository.count_table("stones").await?,
        categories: repository.count_table("categories").await?,
        stores: repository.count_table("stores").await?,
        ledger_entries: repository.count_table("ledger_entries").await?,
        ledger_total: repository.ledger_total().await?,
    };

    Ok(Json(summary))
}
