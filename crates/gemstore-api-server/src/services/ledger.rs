//! Ledger pivot engine.
//!
//! Pure transform from a flat entry list to the filtered view the dashboard
//! renders: either the filtered entries themselves or a date-by-name matrix
//! of summed amounts. No state, no side effects; callers re-run it on every
//! filter change.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use crate::database::models::LedgerEntry;

#[derive(Debug, Clone, Default)]
pub struct LedgerQuery {
    /// Case-insensitive substring filter. Applies to entry names in flat
    /// mode and to column labels in pivot mode; the two act on different
    /// shapes and are intentionally not unified.
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub pivot: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PivotRow {
    pub date: String,
    /// One cell per column, aligned with `PivotTable::columns`. Missing
    /// (day, name) pairs are zero-filled.
    pub cells: Vec<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PivotTable {
    /// Display labels in first-seen order, original casing preserved.
    pub columns: Vec<String>,
    /// Rows sorted descending by date.
    pub rows: Vec<PivotRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LedgerView {
    Flat { entries: Vec<LedgerEntry> },
    Pivoted { table: PivotTable },
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerReport {
    pub view: LedgerView,
    pub total: Decimal,
}

/// Calendar-day date filter. Both bounds form an inclusive range; a single
/// bound matches that exact day only. The single-sided behavior mirrors the
/// dashboard it replaces and is pinned by tests below.
fn day_matches(day: NaiveDate, query: &LedgerQuery) -> bool {
    match (query.start_date, query.end_date) {
        (Some(start), Some(end)) => day >= start && day <= end,
        (Some(start), None) => day == start,
        (None, Some(end)) => day == end,
        (None, None) => true,
    }
}

fn format_day(day: NaiveDate) -> String {
    day.format("%-m/%-d/%Y").to_string()
}

/// Grouping key: lowercased and trimmed. Display keeps the first-seen casing.
fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn build_report(entries: &[LedgerEntry], query: &LedgerQuery) -> LedgerReport {
    let dated: Vec<&LedgerEntry> = entries
        .iter()
        .filter(|e| day_matches(e.entry_date.date_naive(), query))
        .collect();

    let needle = query.name.trim().to_lowercase();

    if !query.pivot {
        let kept: Vec<LedgerEntry> = dated
            .into_iter()
            .filter(|e| needle.is_empty() || e.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        let total = kept.iter().map(|e| e.amount).sum();
        return LedgerReport {
            view: LedgerView::Flat { entries: kept },
            total,
        };
    }

    // Group by (calendar day, normalized name), summing amounts. Column and
    // day orders are first-seen; days are re-sorted descending afterwards.
    let mut columns: Vec<(String, String)> = Vec::new(); // (normalized, label)
    let mut days: Vec<NaiveDate> = Vec::new();
    let mut sums: HashMap<(NaiveDate, String), Decimal> = HashMap::new();

    for entry in &dated {
        let norm = normalize_name(&entry.name);
        if !columns.iter().any(|(n, _)| n == &norm) {
            columns.push((norm.clone(), entry.name.trim().to_string()));
        }
        let day = entry.entry_date.date_naive();
        if !days.contains(&day) {
            days.push(day);
        }
        *sums.entry((day, norm)).or_insert(Decimal::ZERO) += entry.amount;
    }

    let kept_columns: Vec<(String, String)> = columns
        .into_iter()
        .filter(|(_, label)| needle.is_empty() || label.to_lowercase().contains(&needle))
        .collect();

    // A row survives only if at least one surviving column has data that day.
    let mut kept_days: Vec<NaiveDate> = days
        .into_iter()
        .filter(|day| {
            kept_columns
                .iter()
                .any(|(norm, _)| sums.contains_key(&(*day, norm.clone())))
        })
        .collect();
    kept_days.sort_unstable_by(|a, b| b.cmp(a));

    let mut total = Decimal::ZERO;
    let mut rows = Vec::with_capacity(kept_days.len());
    for day in &kept_days {
        let mut cells = Vec::with_capacity(kept_columns.len());
        for (norm, _) in &kept_columns {
            let value = sums
                .get(&(*day, norm.clone()))
                .copied()
                .unwrap_or(Decimal::ZERO);
            total += value;
            cells.push(value);
        }
        rows.push(PivotRow {
            date: format_day(*day),
            cells,
        });
    }

    LedgerReport {
        view: LedgerView::Pivoted {
            table: PivotTable {
                columns: kept_columns.into_iter().map(|(_, label)| label).collect(),
                rows,
            },
        },
        total,
    }
}

/// Serialize whichever view is active, exactly as displayed: header row plus
/// one comma-joined line per record. Cells are plain numbers; embedded commas
/// are not escaped (known limitation of the format this replaces).
pub fn export_csv(report: &LedgerReport) -> String {
    let mut out = String::new();
    match &report.view {
        LedgerView::Flat { entries } => {
            out.push_str("Name,Amount,Date\n");
            for entry in entries {
                out.push_str(&format!(
                    "{},{},{}\n",
                    entry.name,
                    entry.amount,
                    format_day(entry.entry_date.date_naive())
                ));
            }
        }
        LedgerView::Pivoted { table } => {
            out.push_str("Date");
            for column in &table.columns {
                out.push(',');
                out.push_str(column);
            }
            out.push('\n');
            for row in &table.rows {
                out.push_str(&row.date);
                for cell in &row.cells {
                    out.push(',');
                    out.push_str(&cell.to_string());
                }
                out.push('\n');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn entry(name: &str, amount: Decimal, date: (i32, u32, u32)) -> LedgerEntry {
        let entry_date = Utc
            .with_ymd_and_hms(date.0, date.1, date.2, 10, 30, 0)
            .unwrap();
        LedgerEntry {
            id: Uuid::new_v4(),
            name: name.to_string(),
            amount,
            entry_date,
            created_at: entry_date,
        }
    }

    fn sample() -> Vec<LedgerEntry> {
        vec![
            entry("Ali", dec!(100), (2024, 1, 1)),
            entry("ali", dec!(50), (2024, 1, 1)),
            entry("Sara", dec!(30), (2024, 1, 2)),
        ]
    }

    fn pivot_query() -> LedgerQuery {
        LedgerQuery {
            pivot: true,
            ..Default::default()
        }
    }

    fn table(report: &LedgerReport) -> &PivotTable {
        match &report.view {
            LedgerView::Pivoted { table } => table,
            LedgerView::Flat { .. } => panic!("expected pivoted view"),
        }
    }

    fn flat(report: &LedgerReport) -> &[LedgerEntry] {
        match &report.view {
            LedgerView::Flat { entries } => entries,
            LedgerView::Pivoted { .. } => panic!("expected flat view"),
        }
    }

    #[test]
    fn pivot_groups_by_day_and_normalized_name() {
        let report = build_report(&sample(), &pivot_query());
        let table = table(&report);

        assert_eq!(table.columns, vec!["Ali", "Sara"]);
        assert_eq!(table.rows.len(), 2);

        // Rows descend by date; missing cells are zero-filled.
        assert_eq!(table.rows[0].date, "1/2/2024");
        assert_eq!(table.rows[0].cells, vec![dec!(0), dec!(30)]);
        assert_eq!(table.rows[1].date, "1/1/2024");
        assert_eq!(table.rows[1].cells, vec![dec!(150), dec!(0)]);

        assert_eq!(report.total, dec!(180));
    }

    #[test]
    fn label_keeps_first_seen_casing_and_trims_whitespace() {
        let entries = vec![
            entry(" ALI ", dec!(10), (2024, 3, 1)),
            entry("Ali", dec!(5), (2024, 3, 1)),
        ];
        let report = build_report(&entries, &pivot_query());
        let table = table(&report);

        assert_eq!(table.columns, vec!["ALI"]);
        assert_eq!(table.rows[0].cells, vec![dec!(15)]);
    }

    #[test]
    fn name_filter_narrows_pivot_columns_and_rows() {
        let query = LedgerQuery {
            name: "sar".to_string(),
            ..pivot_query()
        };
        let report = build_report(&sample(), &query);
        let table = table(&report);

        assert_eq!(table.columns, vec!["Sara"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].date, "1/2/2024");
        assert_eq!(table.rows[0].cells, vec![dec!(30)]);
        assert_eq!(report.total, dec!(30));
    }

    #[test]
    fn name_filter_in_flat_mode_matches_entry_names() {
        let query = LedgerQuery {
            name: "sar".to_string(),
            ..Default::default()
        };
        let report = build_report(&sample(), &query);
        let entries = flat(&report);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Sara");
        assert_eq!(report.total, dec!(30));
    }

    #[test]
    fn single_sided_start_date_matches_exact_day_only() {
        // Not "on or after": the 2024-01-02 entry is dropped even though it
        // comes after the start date.
        let query = LedgerQuery {
            start_date: Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            ..Default::default()
        };
        let report = build_report(&sample(), &query);
        let entries = flat(&report);

        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.name.eq_ignore_ascii_case("ali")));
        assert_eq!(report.total, dec!(150));
    }

    #[test]
    fn single_sided_end_date_matches_exact_day_only() {
        let query = LedgerQuery {
            end_date: Some(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
            ..Default::default()
        };
        let report = build_report(&sample(), &query);
        let entries = flat(&report);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Sara");
    }

    #[test]
    fn two_sided_range_is_inclusive() {
        let query = LedgerQuery {
            start_date: Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            end_date: Some(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
            ..Default::default()
        };
        let report = build_report(&sample(), &query);

        assert_eq!(flat(&report).len(), 3);
        assert_eq!(report.total, dec!(180));
    }

    #[test]
    fn pivot_total_equals_flat_total_over_same_filter() {
        // Grouping only redistributes amounts, never drops or duplicates.
        let entries = vec![
            entry("Ali", dec!(12.50), (2024, 2, 1)),
            entry("ali ", dec!(7.25), (2024, 2, 1)),
            entry("Sara", dec!(3.10), (2024, 2, 2)),
            entry("Omar", dec!(44), (2024, 2, 3)),
            entry("sara", dec!(0.90), (2024, 2, 3)),
        ];
        let flat_query = LedgerQuery {
            start_date: Some(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()),
            end_date: Some(NaiveDate::from_ymd_opt(2024, 2, 3).unwrap()),
            ..Default::default()
        };
        let pivot_query = LedgerQuery {
            pivot: true,
            ..flat_query.clone()
        };

        let flat_report = build_report(&entries, &flat_query);
        let pivot_report = build_report(&entries, &pivot_query);

        let cell_sum: Decimal = match &pivot_report.view {
            LedgerView::Pivoted { table } => {
                table.rows.iter().flat_map(|r| r.cells.iter()).sum()
            }
            LedgerView::Flat { .. } => panic!("expected pivoted view"),
        };

        assert_eq!(flat_report.total, pivot_report.total);
        assert_eq!(cell_sum, pivot_report.total);
        assert_eq!(pivot_report.total, dec!(67.75));
    }

    #[test]
    fn empty_filtered_set_yields_empty_report() {
        let query = LedgerQuery {
            start_date: Some(NaiveDate::from_ymd_opt(1999, 1, 1).unwrap()),
            ..pivot_query()
        };
        let report = build_report(&sample(), &query);
        let table = table(&report);

        assert!(table.columns.is_empty());
        assert!(table.rows.is_empty());
        assert_eq!(report.total, dec!(0));
    }

    #[test]
    fn csv_export_of_pivoted_view() {
        let report = build_report(&sample(), &pivot_query());
        let csv = export_csv(&report);

        assert_eq!(
            csv,
            "Date,Ali,Sara\n1/2/2024,0,30\n1/1/2024,150,0\n"
        );
    }

    #[test]
    fn csv_export_of_flat_view() {
        let query = LedgerQuery {
            name: "sar".to_string(),
            ..Default::default()
        };
        let report = build_report(&sample(), &query);
        let csv = export_csv(&report);

        assert_eq!(csv, "Name,Amount,Date\nSara,30,1/2/2024\n");
    }
}
