//! Row filtering and type coercion of the raw transaction log

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use tracing::{info, warn};

use crate::data::{RawTable, REQUIRED_COLUMNS};
use crate::error::AnalysisError;

/// Layouts accepted for `InvoiceDate`, tried in order after RFC 3339.
const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// What to do with a record whose `InvoiceDate` cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatePolicy {
    /// Fail the whole run
    #[default]
    Strict,
    /// Drop the record and count it
    SkipMalformed,
}

/// One cleaned transaction line
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub description: String,
    pub quantity: i64,
    pub invoice_date: NaiveDateTime,
    pub country: Option<String>,
}

impl Transaction {
    /// Hour of day (0-23) the invoice was issued
    pub fn hour(&self) -> u32 {
        self.invoice_date.hour()
    }

    /// Calendar date the invoice was issued
    pub fn date(&self) -> NaiveDate {
        self.invoice_date.date()
    }
}

/// Cleaned transaction table, owned by the pipeline after cleaning
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionTable {
    records: Vec<Transaction>,
}

impl TransactionTable {
    pub fn new(records: Vec<Transaction>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Transaction] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn head(&self, n: usize) -> &[Transaction] {
        &self.records[..n.min(self.records.len())]
    }

    /// Back to the textual representation, with the required columns only
    pub fn to_raw(&self) -> RawTable {
        let headers = REQUIRED_COLUMNS.iter().map(|h| h.to_string()).collect();
        let rows = self
            .records
            .iter()
            .map(|t| {
                vec![
                    Some(t.description.clone()),
                    Some(t.quantity.to_string()),
                    Some(t.invoice_date.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
                    t.country.clone(),
                ]
            })
            .collect();
        RawTable::new(headers, rows)
    }
}

/// Row counts before and after each cleaning step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleaningStats {
    pub rows_before: usize,
    pub dropped_missing_description: usize,
    pub dropped_non_positive_quantity: usize,
    pub dropped_malformed_date: usize,
    pub rows_after: usize,
}

impl CleaningStats {
    pub fn dropped(&self) -> usize {
        self.rows_before - self.rows_after
    }
}

/// Clean a raw transaction table
///
/// Steps run in order over the whole table:
/// 1. drop records without a description
/// 2. drop records whose quantity is missing or not positive
/// 3. parse `InvoiceDate`, failing or skipping per `policy`
///
/// Surviving records keep their original order.
pub fn clean(raw: RawTable, policy: DatePolicy) -> crate::Result<(TransactionTable, CleaningStats)> {
    let desc_idx = require_column(&raw, "Description")?;
    let qty_idx = require_column(&raw, "Quantity")?;
    let date_idx = require_column(&raw, "InvoiceDate")?;
    let country_idx = require_column(&raw, "Country")?;

    let rows_before = raw.len();

    // Record numbers are 1-based positions in the loaded table.
    let described: Vec<(usize, Vec<Option<String>>)> = raw
        .rows
        .into_iter()
        .enumerate()
        .map(|(idx, row)| (idx + 1, row))
        .filter(|(_, row)| field(row, desc_idx).is_some_and(|d| !d.trim().is_empty()))
        .collect();
    let dropped_missing_description = rows_before - described.len();

    let mut positive = Vec::with_capacity(described.len());
    for (record, row) in described.iter() {
        match parse_quantity(*record, field(row, qty_idx))? {
            Some(quantity) if quantity > 0 => positive.push((*record, quantity, row)),
            _ => {}
        }
    }
    let dropped_non_positive_quantity = described.len() - positive.len();

    let mut records = Vec::with_capacity(positive.len());
    let mut dropped_malformed_date = 0;
    for (record, quantity, row) in positive {
        let raw_date = field(row, date_idx).unwrap_or_default();
        let Some(invoice_date) = parse_invoice_date(raw_date) else {
            match policy {
                DatePolicy::Strict => {
                    return Err(AnalysisError::Parse {
                        record,
                        column: "InvoiceDate",
                        value: raw_date.to_string(),
                        message: "unrecognized timestamp".to_string(),
                    });
                }
                DatePolicy::SkipMalformed => {
                    if dropped_malformed_date == 0 {
                        warn!(record, value = raw_date, "skipping records with malformed InvoiceDate");
                    }
                    dropped_malformed_date += 1;
                    continue;
                }
            }
        };

        records.push(Transaction {
            description: field(row, desc_idx).unwrap_or_default().to_string(),
            quantity,
            invoice_date,
            country: field(row, country_idx).map(str::to_string),
        });
    }

    let stats = CleaningStats {
        rows_before,
        dropped_missing_description,
        dropped_non_positive_quantity,
        dropped_malformed_date,
        rows_after: records.len(),
    };

    info!(
        rows_before = stats.rows_before,
        rows_after = stats.rows_after,
        missing_description = stats.dropped_missing_description,
        non_positive_quantity = stats.dropped_non_positive_quantity,
        malformed_date = stats.dropped_malformed_date,
        "cleaned transaction table"
    );

    Ok((TransactionTable::new(records), stats))
}

/// Parse an `InvoiceDate` value, keeping wall-clock time for offset forms
pub fn parse_invoice_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }

    let naive = value.strip_suffix('Z').unwrap_or(value);
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(naive, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Whole numbers, also when written as a float such as `6.0`
fn parse_quantity(record: usize, value: Option<&str>) -> crate::Result<Option<i64>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let token = value.trim();
    if let Ok(quantity) = token.parse::<i64>() {
        return Ok(Some(quantity));
    }

    let parse_error = |message: String| AnalysisError::Parse {
        record,
        column: "Quantity",
        value: value.to_string(),
        message,
    };
    let float = token.parse::<f64>().map_err(|e| parse_error(e.to_string()))?;
    if float.is_finite() && float.fract() == 0.0 && float.abs() < i64::MAX as f64 {
        Ok(Some(float as i64))
    } else {
        Err(parse_error("not a whole number".to_string()))
    }
}

fn require_column(raw: &RawTable, name: &str) -> crate::Result<usize> {
    raw.column_index(name).ok_or_else(|| {
        AnalysisError::format("transaction table", format!("missing required column: {name}"))
    })
}

fn field(row: &[Option<String>], idx: usize) -> Option<&str> {
    row.get(idx).and_then(|v| v.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(rows: &[[&str; 4]]) -> RawTable {
        let headers = REQUIRED_COLUMNS.iter().map(|h| h.to_string()).collect();
        let rows = rows
            .iter()
            .map(|r| {
                r.iter()
                    .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
                    .collect()
            })
            .collect();
        RawTable::new(headers, rows)
    }

    #[test]
    fn test_clean_drops_invalid_rows_in_order() {
        let table = raw(&[
            ["MUG", "2", "2011-01-04 10:00", "United Kingdom"],
            ["", "5", "2011-01-04 10:05", "France"],
            ["   ", "5", "2011-01-04 10:05", "France"],
            ["TEAPOT", "0", "2011-01-04 11:00", "Germany"],
            ["TEAPOT", "-3", "2011-01-04 11:00", "Germany"],
            ["TEAPOT", "", "2011-01-04 11:00", "Germany"],
            ["LANTERN", "1", "2011-01-05 12:30", "EIRE"],
        ]);

        let (cleaned, stats) = clean(table, DatePolicy::Strict).unwrap();

        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned.records()[0].description, "MUG");
        assert_eq!(cleaned.records()[1].description, "LANTERN");
        assert_eq!(
            stats,
            CleaningStats {
                rows_before: 7,
                dropped_missing_description: 2,
                dropped_non_positive_quantity: 3,
                dropped_malformed_date: 0,
                rows_after: 2,
            }
        );
        assert_eq!(stats.dropped(), 5);
    }

    #[test]
    fn test_strict_policy_fails_on_bad_date() {
        let table = raw(&[
            ["MUG", "2", "2011-01-04 10:00", "United Kingdom"],
            ["MUG", "2", "not-a-date", "United Kingdom"],
        ]);

        match clean(table, DatePolicy::Strict) {
            Err(AnalysisError::Parse { record, column, value, .. }) => {
                assert_eq!(record, 2);
                assert_eq!(column, "InvoiceDate");
                assert_eq!(value, "not-a-date");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_date_on_dropped_row_is_ignored() {
        let table = raw(&[
            ["MUG", "-2", "not-a-date", "United Kingdom"],
            ["", "2", "also-bad", "United Kingdom"],
        ]);
        let (cleaned, _) = clean(table, DatePolicy::Strict).unwrap();
        assert!(cleaned.is_empty());
    }

    #[test]
    fn test_skip_policy_counts_bad_dates() {
        let table = raw(&[
            ["MUG", "2", "2011-01-04 10:00", "United Kingdom"],
            ["MUG", "2", "not-a-date", "United Kingdom"],
            ["MUG", "2", "", "United Kingdom"],
        ]);
        let (cleaned, stats) = clean(table, DatePolicy::SkipMalformed).unwrap();
        assert_eq!(cleaned.len(), 1);
        assert_eq!(stats.dropped_malformed_date, 2);
    }

    #[test]
    fn test_non_integer_quantity_is_parse_error() {
        let table = raw(&[["MUG", "two", "2011-01-04 10:00", "United Kingdom"]]);
        let err = clean(table, DatePolicy::Strict).unwrap_err();
        assert!(matches!(err, AnalysisError::Parse { column: "Quantity", .. }));

        let table = raw(&[["MUG", "2.5", "2011-01-04 10:00", "United Kingdom"]]);
        let err = clean(table, DatePolicy::Strict).unwrap_err();
        assert!(err.to_string().contains("not a whole number"), "{err}");
    }

    #[test]
    fn test_integral_float_quantity_is_accepted() {
        let table = raw(&[
            ["MUG", "6.0", "2011-01-04 10:00", "United Kingdom"],
            ["MUG", "-1.0", "2011-01-04 10:00", "United Kingdom"],
            ["MUG", "0.0", "2011-01-04 10:00", "United Kingdom"],
        ]);
        let (cleaned, stats) = clean(table, DatePolicy::Strict).unwrap();
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned.records()[0].quantity, 6);
        assert_eq!(stats.dropped_non_positive_quantity, 2);
    }

    #[test]
    fn test_clean_is_idempotent() {
        let table = raw(&[
            ["MUG", "2", "2011-01-04T10:00:00", "United Kingdom"],
            ["", "5", "2011-01-04 10:05", "France"],
            ["LANTERN", "1", "12/5/2011 12:30", ""],
            ["CLOCK", "4", "2011-01-06 09:15:30.250", "Spain"],
        ]);
        let (once, _) = clean(table, DatePolicy::Strict).unwrap();
        let (twice, stats) = clean(once.to_raw(), DatePolicy::Strict).unwrap();

        assert_eq!(once, twice);
        assert_eq!(stats.dropped(), 0);
    }

    #[test]
    fn test_parse_invoice_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2010, 12, 1)
            .unwrap()
            .and_hms_opt(8, 26, 0)
            .unwrap();

        for value in [
            "2010-12-01T08:26:00",
            "2010-12-01 08:26:00",
            "2010-12-01 08:26",
            "2010-12-01T08:26",
            "2010-12-01T08:26:00Z",
            "2010-12-01T08:26:00+01:00",
            "12/1/2010 8:26",
            "12/01/2010 08:26:00",
            " 2010-12-01 08:26 ",
        ] {
            assert_eq!(parse_invoice_date(value), Some(expected), "{value}");
        }

        assert_eq!(
            parse_invoice_date("2010-12-01"),
            NaiveDate::from_ymd_opt(2010, 12, 1).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_invoice_date("not-a-date"), None);
        assert_eq!(parse_invoice_date("2010-13-01 08:26"), None);
        assert_eq!(parse_invoice_date(""), None);
    }

    #[test]
    fn test_derived_hour_and_date() {
        let t = Transaction {
            description: "MUG".to_string(),
            quantity: 1,
            invoice_date: parse_invoice_date("2024-01-01T23:59:00").unwrap(),
            country: None,
        };
        assert_eq!(t.hour(), 23);
        assert_eq!(t.date(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }
}
