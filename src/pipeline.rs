//! Load → clean → aggregate, producing everything the sinks need

use std::path::PathBuf;
use std::time::Instant;

use tracing::debug;

use crate::aggregate::{summarize, SalesSummary, DEFAULT_TOP_N};
use crate::clean::{clean, CleaningStats, DatePolicy, TransactionTable};
use crate::data::load_transactions;
use crate::report::Report;

/// Validated pipeline settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub delimiter: u8,
    pub top_n: usize,
    pub preview_rows: usize,
    pub date_policy: DatePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data.csv"),
            delimiter: b',',
            top_n: DEFAULT_TOP_N,
            preview_rows: 5,
            date_policy: DatePolicy::Strict,
        }
    }
}

/// Output of the computing stages
#[derive(Debug)]
pub struct Analysis {
    pub table: TransactionTable,
    pub stats: CleaningStats,
    pub summary: SalesSummary,
    pub report: Report,
}

/// Run the loading, cleaning and aggregation stages
///
/// Any fatal error stops the run before later stages start.
pub fn analyze(config: &PipelineConfig) -> crate::Result<Analysis> {
    let start = Instant::now();

    let raw = load_transactions(&config.input, config.delimiter)?;
    let preview = raw.head(config.preview_rows);
    let profile = raw.profile();
    debug!(elapsed_ms = start.elapsed().as_millis() as u64, "load stage finished");

    let (table, stats) = clean(raw, config.date_policy)?;
    debug!(elapsed_ms = start.elapsed().as_millis() as u64, "clean stage finished");

    let summary = summarize(&table, config.top_n);
    debug!(elapsed_ms = start.elapsed().as_millis() as u64, "aggregate stage finished");

    let report = Report {
        source: config.input.display().to_string(),
        preview,
        profile,
        stats,
        cleaned_preview: table.head(config.preview_rows).to_vec(),
        summary: summary.clone(),
        top_n: config.top_n,
    };

    Ok(Analysis {
        table,
        stats,
        summary,
        report,
    })
}
