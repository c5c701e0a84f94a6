use axum::{
    extract::{Extension, Path, Query},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::Claims;
use crate::database::{LedgerEntry, Repository};
use crate::logging::{AuditAction, AuditLog, AuditLogger};
use crate::services::ledger::{self, LedgerQuery, LedgerView, PivotRow};
use crate::utils::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct LedgerReportParams {
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub pivot: Option<bool>,
}

impl LedgerReportParams {
    fn into_query(self) -> LedgerQuery {
        LedgerQuery {
            name: self.name.unwrap_or_default(),
            start_date: self.start_date,
            end_date: self.end_date,
            pivot: self.pivot.unwrap_or(false),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LedgerReportResponse {
    pub pivot: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<LedgerEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<PivotRow>>,
    pub total: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct LedgerEntryRequest {
    pub name: String,
    pub amount: Decimal,
    pub entry_date: DateTime<Utc>,
}

/// The report is recomputed from the full entry list on every request, the
/// same way the dashboard recomputes on every filter change.
pub async fn ledger_report_handler(
    Extension(repository): Extension<Arc<Repository>>,
    Query(params): Query<LedgerReportParams>,
) -> Result<Json<LedgerReportResponse>, ApiError> {
    let entries = repository.list_ledger_entries().await?;
    let report = ledger::build_report(&entries, &params.into_query());

    let response = match report.view {
        LedgerView::Flat { entries } => LedgerReportResponse {
            pivot: false,
            entries: Some(entries),
            columns: None,
            rows: None,
            total: report.total,
        },
        LedgerView::Pivoted { table } => LedgerReportResponse {
            pivot: true,
            entries: None,
            columns: Some(table.columns),
            rows: Some(table.rows),
            total: report.total,
        },
    };

    Ok(Json(response))
}

/// CSV of whichever view the filters select, identical to what the screen
/// shows for the same query string.
pub async fn ledger_export_handler(
    Extension(repository): Extension<Arc<Repository>>,
    Query(params): Query<LedgerReportParams>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = repository.list_ledger_entries().await?;
    let report = ledger::build_report(&entries, &params.into_query());
    let csv = ledger::export_csv(&report);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"ledger.csv\"",
            ),
        ],
        csv,
    ))
}

pub async fn create_ledger_entry_handler(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<LedgerEntryRequest>,
) -> Result<Json<LedgerEntry>, ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }

    let entry = repository
        .insert_ledger_entry(name, request.amount, request.entry_date)
        .await?;

    audit.log(
        AuditLog::new(AuditAction::Created, "ledger_entry")
            .actor(claims.user_id)
            .entity_id(entry.id),
    );

    Ok(Json(entry))
}

pub async fn update_ledger_entry_handler(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<LedgerEntryRequest>,
) -> Result<Json<LedgerEntry>, ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }

    repository
        .find_ledger_entry(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Ledger entry not found".to_string()))?;

    let entry = repository
        .update_ledger_entry(id, name, request.amount, request.entry_date)
        .await?;

    audit.log(
        AuditLog::new(AuditAction::Updated, "ledger_entry")
            .actor(claims.user_id)
            .entity_id(entry.id),
    );

    Ok(Json(entry))
}

pub async fn delete_ledger_entry_handler(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !repository.delete_ledger_entry(id).await? {
        return Err(ApiError::NotFound("Ledger entry not found".to_string()));
    }

    audit.log(
        AuditLog::new(AuditAction::Deleted, "ledger_entry")
            .actor(claims.user_id)
            .entity_id(id),
    );

    Ok(Json(serde_json::json!({ "deleted": true })))
}
