//! Console report assembled from every pipeline stage

use std::fmt::Display;
use std::io::{self, Write};

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use crate::aggregate::SalesSummary;
use crate::clean::{CleaningStats, Transaction};
use crate::data::{RawTable, TableProfile};
use crate::viz::ChartOutcome;

/// Series longer than this are shown as head and tail only
const FULL_LISTING_LIMIT: usize = 60;
const TRUNCATED_EDGE: usize = 5;

/// Everything printed to the console, in print order
#[derive(Debug, Clone)]
pub struct Report {
    /// Name of the input shown in the banner
    pub source: String,
    pub preview: RawTable,
    pub profile: TableProfile,
    pub stats: CleaningStats,
    pub cleaned_preview: Vec<Transaction>,
    pub summary: SalesSummary,
    pub top_n: usize,
}

impl Report {
    /// Everything up to and including the dashboard summary
    pub fn write_body<W: Write>(&self, out: &mut W) -> io::Result<()> {
        banner(out, 40, "   E-Commerce Sales Data Analysis")?;
        writeln!(out, "Source: {}", self.source)?;

        writeln!(out, "\nFirst rows of dataset:")?;
        writeln!(out, "{}", raw_preview_table(&self.preview))?;

        writeln!(out, "\nGeneral information of dataset:")?;
        writeln!(
            out,
            "{} rows, {} columns",
            self.profile.rows,
            self.profile.columns.len()
        )?;
        let mut info = new_table(vec!["#", "Column", "Non-Null Count", "Kind"]);
        for (idx, column) in self.profile.columns.iter().enumerate() {
            info.add_row(vec![
                idx.to_string(),
                column.name.clone(),
                column.non_null.to_string(),
                column.kind.as_str().to_string(),
            ]);
        }
        writeln!(out, "{info}")?;

        writeln!(out, "\nNull values by column:")?;
        let mut nulls = new_table(vec!["Column", "Nulls"]);
        for column in &self.profile.columns {
            nulls.add_row(vec![column.name.clone(), column.nulls.to_string()]);
        }
        writeln!(out, "{nulls}")?;

        writeln!(out, "\nRows after clean: {}", self.stats.rows_after)?;
        writeln!(
            out,
            "Dropped {} of {} rows: {} without description, {} with non-positive quantity, {} with malformed date",
            self.stats.dropped(),
            self.stats.rows_before,
            self.stats.dropped_missing_description,
            self.stats.dropped_non_positive_quantity,
            self.stats.dropped_malformed_date,
        )?;
        writeln!(out, "{}", cleaned_preview_table(&self.cleaned_preview))?;

        writeln!(out, "\nTop {} countries with most sales:", self.top_n)?;
        writeln!(out, "{}", counts_table("Country", "Sales", &self.summary.top_countries))?;

        writeln!(out, "\nTop {} products with most sales:", self.top_n)?;
        writeln!(out, "{}", counts_table("Description", "Sales", &self.summary.top_products))?;

        writeln!(out, "\nSales per hour of day:")?;
        let hours: Vec<(u32, usize)> = self.summary.sales_per_hour.iter().map(|(h, c)| (*h, *c)).collect();
        writeln!(out, "{}", counts_table("Hour", "Sales", &hours))?;

        writeln!(out, "\nSales per day:")?;
        let days: Vec<(String, usize)> = self
            .summary
            .sales_per_day
            .iter()
            .map(|(d, c)| (d.format("%Y-%m-%d").to_string(), *c))
            .collect();
        writeln!(out, "{}", counts_table("Date", "Sales", &days))?;
        if days.len() > FULL_LISTING_LIMIT {
            writeln!(out, "Length: {}", days.len())?;
        }

        writeln!(out)?;
        banner(out, 50, "E-Commerce Sales Dashboard")?;
        writeln!(
            out,
            "\nTotal number of transactions after cleaning: {}",
            self.summary.total_transactions
        )?;
        match &self.summary.date_range {
            Some(range) => writeln!(
                out,
                "Date range: from {} to {}",
                range.start.date(),
                range.end.date()
            )?,
            None => writeln!(out, "Date range: no transactions")?,
        }

        writeln!(out, "\nTop {} countries with most purchases:", self.top_n)?;
        writeln!(out, "{}", counts_table("Country", "Sales", &self.summary.top_countries))?;

        writeln!(out, "\nTop {} best-selling products:", self.top_n)?;
        writeln!(out, "{}", counts_table("Description", "Sales", &self.summary.top_products))?;
        Ok(())
    }

    /// Chart summary and closing banner, written after plotting
    pub fn write_footer<W: Write>(&self, out: &mut W, charts: &[ChartOutcome]) -> io::Result<()> {
        if charts.is_empty() {
            writeln!(out, "\nCharts: skipped")?;
        } else {
            writeln!(out, "\nCharts:")?;
            for outcome in charts {
                match &outcome.result {
                    Ok(path) => writeln!(out, "  ✓ {}: {}", outcome.name, path.display())?,
                    Err(e) => writeln!(out, "  ✗ {}: {}", outcome.name, e)?,
                }
            }
        }

        writeln!(out, "\nDashboard execution complete.")?;
        banner(out, 50, "End of report")
    }
}

fn banner<W: Write>(out: &mut W, width: usize, title: &str) -> io::Result<()> {
    let rule = "=".repeat(width);
    writeln!(out, "{rule}")?;
    writeln!(out, "{title}")?;
    writeln!(out, "{rule}")
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn raw_preview_table(preview: &RawTable) -> Table {
    let mut table = new_table(preview.headers.iter().map(String::as_str).collect());
    for row in &preview.rows {
        table.add_row(
            row.iter()
                .map(|v| v.clone().unwrap_or_else(|| "NaN".to_string()))
                .collect::<Vec<_>>(),
        );
    }
    table
}

fn cleaned_preview_table(rows: &[Transaction]) -> Table {
    let mut table = new_table(vec!["Description", "Quantity", "InvoiceDate", "Country", "Hour", "Date"]);
    for t in rows {
        table.add_row(vec![
            t.description.clone(),
            t.quantity.to_string(),
            t.invoice_date.format("%Y-%m-%d %H:%M:%S").to_string(),
            t.country.clone().unwrap_or_else(|| "NaN".to_string()),
            t.hour().to_string(),
            t.date().to_string(),
        ]);
    }
    table
}

/// Key/count listing, shortened to head and tail when long
fn counts_table<K: Display>(key: &str, value: &str, counts: &[(K, usize)]) -> Table {
    let mut table = new_table(vec![key, value]);
    let row = |(k, c): &(K, usize)| vec![k.to_string(), c.to_string()];

    if counts.len() > FULL_LISTING_LIMIT {
        for entry in &counts[..TRUNCATED_EDGE] {
            table.add_row(row(entry));
        }
        table.add_row(vec!["...".to_string(), "...".to_string()]);
        for entry in &counts[counts.len() - TRUNCATED_EDGE..] {
            table.add_row(row(entry));
        }
    } else {
        for entry in counts {
            table.add_row(row(entry));
        }
    }
    table
}
