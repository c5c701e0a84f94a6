pub mod auth;
pub mod categories;
pub mod dashboard;
pub mod health;
pub mod ledger;
pub mod products;
pub mod stones;
pub mod stores;
pub mod vendors;

use crate::database::models::EntityStatus;
use crate::utils::error::ApiError;

/// Normalize and validate an active/inactive status string from a request.
pub(crate) fn parse_status(status: &str) -> Result<String, ApiError> {
    EntityStatus::from_str(status)
        .map(|s| s.as_str().to_string())
        .ok_or_else(|| {
            ApiError::Validation(format!("Invalid status: {} (expected active|inactive)", status))
        })
}
