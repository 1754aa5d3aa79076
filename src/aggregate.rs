//! Frequency aggregates over the cleaned transaction table

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::clean::TransactionTable;

/// Number of entries kept in the top-N views by default
pub const DEFAULT_TOP_N: usize = 10;

/// Earliest and latest invoice timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Derived views computed once over the cleaned table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SalesSummary {
    /// Country -> sales count, count descending
    pub top_countries: Vec<(String, usize)>,
    /// Description -> sales count, count descending
    pub top_products: Vec<(String, usize)>,
    /// Hour of day -> sales count, only hours present in the data
    pub sales_per_hour: BTreeMap<u32, usize>,
    /// Calendar date -> sales count
    pub sales_per_day: BTreeMap<NaiveDate, usize>,
    /// `None` for an empty table
    pub date_range: Option<DateRange>,
    /// Total number of cleaned transactions
    pub total_transactions: usize,
}

/// Compute every aggregate view of the table
pub fn summarize(table: &TransactionTable, top_n: usize) -> SalesSummary {
    let summary = SalesSummary {
        top_countries: top_counts(table.iter().filter_map(|t| t.country.as_deref()), top_n),
        top_products: top_counts(table.iter().map(|t| t.description.as_str()), top_n),
        sales_per_hour: sales_per_hour(table),
        sales_per_day: sales_per_day(table),
        date_range: date_range(table),
        total_transactions: table.len(),
    };

    debug!(
        countries = summary.top_countries.len(),
        products = summary.top_products.len(),
        hours = summary.sales_per_hour.len(),
        days = summary.sales_per_day.len(),
        "computed sales aggregates"
    );
    summary
}

/// Count occurrences and keep the `n` most frequent
///
/// Keys with equal counts keep the order in which they first appear.
pub fn top_counts<'a, I>(values: I, n: usize) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut positions: HashMap<&'a str, usize> = HashMap::new();
    let mut counts: Vec<(&'a str, usize)> = Vec::new();

    for value in values {
        match positions.get(value) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                positions.insert(value, counts.len());
                counts.push((value, 1));
            }
        }
    }

    // sort_by is stable, so ties stay in first-appearance order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(n)
        .map(|(key, count)| (key.to_string(), count))
        .collect()
}

pub fn sales_per_hour(table: &TransactionTable) -> BTreeMap<u32, usize> {
    let mut hours = BTreeMap::new();
    for t in table.iter() {
        *hours.entry(t.hour()).or_insert(0) += 1;
    }
    hours
}

pub fn sales_per_day(table: &TransactionTable) -> BTreeMap<NaiveDate, usize> {
    let mut days = BTreeMap::new();
    for t in table.iter() {
        *days.entry(t.date()).or_insert(0) += 1;
    }
    days
}

pub fn date_range(table: &TransactionTable) -> Option<DateRange> {
    let start = table.iter().map(|t| t.invoice_date).min()?;
    let end = table.iter().map(|t| t.invoice_date).max()?;
    Some(DateRange { start, end })
}
