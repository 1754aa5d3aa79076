//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::clean::DatePolicy;
use crate::pipeline::PipelineConfig;

/// Exploratory analysis and charts for a retail transaction log
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file (ISO-8859-1 encoded)
    #[arg(short, long, default_value = "data.csv")]
    pub input: PathBuf,

    /// Directory the chart PNG files are written to
    #[arg(short, long, default_value = "charts")]
    pub output_dir: PathBuf,

    /// Field delimiter of the input file
    #[arg(short, long, default_value_t = ',')]
    pub delimiter: char,

    /// Number of entries in the top countries/products views
    #[arg(long, default_value = "10")]
    pub top: usize,

    /// Rows shown in the dataset previews
    #[arg(long, default_value = "5")]
    pub preview_rows: usize,

    /// Drop records with an unparsable InvoiceDate instead of failing
    #[arg(long)]
    pub skip_bad_dates: bool,

    /// Print the console report only
    #[arg(long)]
    pub no_charts: bool,

    /// Log filter directive, e.g. "info" or "retail_eda=debug"
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Validate the arguments into a pipeline configuration
    pub fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        if !self.delimiter.is_ascii() {
            anyhow::bail!("Delimiter must be a single ASCII character, got {:?}", self.delimiter);
        }
        if self.top == 0 {
            anyhow::bail!("--top must be at least 1");
        }

        Ok(PipelineConfig {
            input: self.input.clone(),
            delimiter: self.delimiter as u8,
            top_n: self.top,
            preview_rows: self.preview_rows,
            date_policy: if self.skip_bad_dates {
                DatePolicy::SkipMalformed
            } else {
                DatePolicy::Strict
            },
        })
    }

    /// Filter directive for the log subscriber
    pub fn log_filter(&self) -> String {
        if self.verbose && self.log_level == "info" {
            "debug".to_string()
        } else {
            self.log_level.clone()
        }
    }

    /// Parsed log filter, rejecting malformed directives
    pub fn env_filter(&self) -> anyhow::Result<EnvFilter> {
        let directive = self.log_filter();
        EnvFilter::try_new(&directive).with_context(|| format!("invalid --log-level {directive:?}"))
    }
}
