//! retail-eda: console report and dashboard charts for a transaction log
//!
//! This is the main entrypoint that runs the analysis pipeline and then
//! hands its results to the console and chart sinks.

use std::fs;
use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use retail_eda::{analyze, render_dashboard, AnalysisError, Args, PlottersRenderer};
use tracing::{info, warn};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let config = args.pipeline_config()?;
    let analysis = analyze(&config)
        .with_context(|| format!("analysis of {} failed", config.input.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    analysis
        .report
        .write_body(&mut out)
        .context("failed to write report")?;
    out.flush()?;

    let outcomes = if args.no_charts {
        info!("chart rendering disabled");
        Vec::new()
    } else {
        if let Err(e) = fs::create_dir_all(&args.output_dir) {
            warn!(dir = %args.output_dir.display(), error = %e, "cannot create chart directory");
        }
        let mut renderer = PlottersRenderer::new(&args.output_dir);
        render_dashboard(&mut renderer, &analysis.summary, config.top_n)
    };

    analysis
        .report
        .write_footer(&mut out, &outcomes)
        .context("failed to write report")?;

    let failures: Vec<&AnalysisError> = outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().err())
        .collect();
    if let Some(fatal) = failures.iter().find(|e| !e.is_recoverable()) {
        anyhow::bail!("chart stage failed: {fatal}");
    }
    if !failures.is_empty() {
        warn!(failed = failures.len(), "some charts could not be rendered");
    }

    Ok(())
}

/// Diagnostics go to stderr so the report on stdout stays clean
fn init_logging(args: &Args) -> Result<()> {
    let filter = args.env_filter()?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
    Ok(())
}
