use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::database::Repository;
use crate::utils::error::ApiError;

static TRAILING_COUNTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})$").expect("static regex"));

/// Derives product SKUs: a vendor-name prefix plus a zero-padded 4-digit
/// counter scoped to that prefix (e.g. `yo0001`).
///
/// Allocation is a read followed by the caller's insert; the unique index on
/// products.sku plus the caller's bounded retry close the race between them.
pub struct SkuService {
    repository: Arc<Repository>,
}

impl SkuService {
    pub fn new(repository: Arc<Repository>) -> Self {
        Self { repository }
    }

    pub async fn allocate(&self, vendor_id: Uuid) -> Result<String, ApiError> {
        let vendor = self
            .repository
            .find_vendor(vendor_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Vendor not found".to_string()))?;

        let prefix = vendor_prefix(&vendor.first_name);
        let latest = self
            .repository
            .find_latest_sku(&sku_pattern(&prefix))
            .await?;

        let sku = next_sku(&prefix, latest.as_deref());
        debug!("Allocated SKU {} for vendor {}", sku, vendor_id);
        Ok(sku)
    }
}

/// First two characters of the vendor's first name, lowercased. A shorter
/// first name yields a shorter prefix with its own counter namespace.
pub fn vendor_prefix(first_name: &str) -> String {
    first_name.chars().take(2).collect::<String>().to_lowercase()
}

/// POSIX pattern matching exactly `<prefix>` followed by 4 digits.
pub fn sku_pattern(prefix: &str) -> String {
    format!("^{}\\d{{4}}$", regex::escape(prefix))
}

/// Next SKU given the highest existing match (lexicographically) for the
/// prefix. No match starts the counter at 1.
pub fn next_sku(prefix: &str, latest: Option<&str>) -> String {
    let counter = latest
        .and_then(|sku| TRAILING_COUNTER.captures(sku))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .map(|n| n + 1)
        .unwrap_or(1);

    format!("{}{:04}", prefix, counter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_first_two_letters_lowercased() {
        assert_eq!(vendor_prefix("Yousef"), "yo");
        assert_eq!(vendor_prefix("ALI"), "al");
    }

    #[test]
    fn short_first_name_yields_short_prefix() {
        assert_eq!(vendor_prefix("J"), "j");
        assert_eq!(vendor_prefix(""), "");
    }

    #[test]
    fn first_allocation_starts_at_one() {
        assert_eq!(next_sku("yo", None), "yo0001");
    }

    #[test]
    fn sequential_allocations_have_no_gaps() {
        let mut latest: Option<String> = None;
        for n in 1..=25u32 {
            let sku = next_sku("yo", latest.as_deref());
            assert_eq!(sku, format!("yo{:04}", n));
            latest = Some(sku);
        }
    }

    #[test]
    fn counter_overflows_past_four_digits() {
        // Past 9999 the pattern stops matching new SKUs; allocation keeps
        // producing 10000 until the unique index rejects it. Pinned so the
        // behavior is changed consciously, not by accident.
        assert_eq!(next_sku("yo", Some("yo9999")), "yo10000");
    }

    #[test]
    fn pattern_escapes_regex_metacharacters() {
        assert_eq!(sku_pattern("a."), r"^a\.\d{4}$");
        assert_eq!(sku_pattern("yo"), r"^yo\d{4}$");
    }
}
