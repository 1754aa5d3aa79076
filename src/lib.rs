//! retail-eda: exploratory analysis of retail transaction logs
//!
//! The pipeline loads a delimited transaction log, drops rows that cannot
//! count as sales, aggregates sales by country, product, hour and day, and
//! reports the results on the console and as charts.

pub mod aggregate;
pub mod clean;
pub mod cli;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod viz;

// Re-export public items for easier access
pub use aggregate::{summarize, DateRange, SalesSummary};
pub use clean::{clean, CleaningStats, DatePolicy, Transaction, TransactionTable};
pub use cli::Args;
pub use data::{load_transactions, read_transactions, RawTable};
pub use error::AnalysisError;
pub use pipeline::{analyze, Analysis, PipelineConfig};
pub use report::Report;
pub use viz::{render_dashboard, ChartKind, ChartRenderer, ChartSpec, PlottersRenderer};

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, AnalysisError>;
