//! Dashboard charts rendered with Plotters

use std::error::Error;
use std::ops::Range;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use plotters::prelude::*;
use tracing::{error, info};

use crate::aggregate::SalesSummary;
use crate::error::AnalysisError;

const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);
const LIGHT_GREEN: RGBColor = RGBColor(144, 238, 144);
const LINE_BLUE: RGBColor = RGBColor(31, 119, 180);

/// Shape of a chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    HorizontalBar,
    LineWithMarkers,
    Line,
}

/// Data points of a chart, keyed by the x (or category) axis
#[derive(Debug, Clone, PartialEq)]
pub enum Series {
    Categorical(Vec<(String, usize)>),
    Hourly(Vec<(u32, usize)>),
    Daily(Vec<(NaiveDate, usize)>),
}

impl Series {
    pub fn len(&self) -> usize {
        match self {
            Series::Categorical(points) => points.len(),
            Series::Hourly(points) => points.len(),
            Series::Daily(points) => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn max_count(&self) -> usize {
        match self {
            Series::Categorical(points) => points.iter().map(|(_, c)| *c).max(),
            Series::Hourly(points) => points.iter().map(|(_, c)| *c).max(),
            Series::Daily(points) => points.iter().map(|(_, c)| *c).max(),
        }
        .unwrap_or(0)
    }
}

/// Everything a renderer needs to draw one chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    /// File stem and identifier, e.g. `top_countries`
    pub name: &'static str,
    pub title: String,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub kind: ChartKind,
    pub series: Series,
}

/// Sink for dashboard charts
pub trait ChartRenderer {
    /// Draw one chart and return where it was written
    fn render(&mut self, chart: &ChartSpec) -> crate::Result<PathBuf>;
}

/// Result of rendering one chart
#[derive(Debug)]
pub struct ChartOutcome {
    pub name: &'static str,
    pub result: crate::Result<PathBuf>,
}

/// The four dashboard charts for a summary
///
/// `top_n` is the size of the top-N views and only feeds the titles.
pub fn dashboard_charts(summary: &SalesSummary, top_n: usize) -> Vec<ChartSpec> {
    vec![
        ChartSpec {
            name: "top_countries",
            title: format!("Top {top_n} Countries by Number of Sales"),
            x_label: "Country",
            y_label: "Number of Sales",
            kind: ChartKind::Bar,
            series: Series::Categorical(summary.top_countries.clone()),
        },
        ChartSpec {
            name: "top_products",
            title: format!("Top {top_n} Best-Selling Products"),
            x_label: "Number of Sales",
            y_label: "Product",
            kind: ChartKind::HorizontalBar,
            series: Series::Categorical(summary.top_products.clone()),
        },
        ChartSpec {
            name: "sales_by_hour",
            title: "Sales by Hour of the Day".to_string(),
            x_label: "Hour",
            y_label: "Number of Sales",
            kind: ChartKind::LineWithMarkers,
            series: Series::Hourly(summary.sales_per_hour.iter().map(|(h, c)| (*h, *c)).collect()),
        },
        ChartSpec {
            name: "sales_by_day",
            title: "Sales Over Time".to_string(),
            x_label: "Date",
            y_label: "Number of Sales",
            kind: ChartKind::Line,
            series: Series::Daily(summary.sales_per_day.iter().map(|(d, c)| (*d, *c)).collect()),
        },
    ]
}

/// Render every dashboard chart, continuing past failures
pub fn render_dashboard<R>(renderer: &mut R, summary: &SalesSummary, top_n: usize) -> Vec<ChartOutcome>
where
    R: ChartRenderer + ?Sized,
{
    dashboard_charts(summary, top_n)
        .iter()
        .map(|chart| {
            let result = renderer.render(chart);
            match &result {
                Ok(path) => info!(chart = chart.name, path = %path.display(), "chart rendered"),
                Err(e) => error!(chart = chart.name, error = %e, "chart rendering failed"),
            }
            ChartOutcome {
                name: chart.name,
                result,
            }
        })
        .collect()
}

/// Writes each chart as a PNG file into a directory
#[derive(Debug, Clone)]
pub struct PlottersRenderer {
    output_dir: PathBuf,
}

impl PlottersRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_path(&self, chart: &ChartSpec) -> PathBuf {
        self.output_dir.join(format!("{}.png", chart.name))
    }
}

impl ChartRenderer for PlottersRenderer {
    fn render(&mut self, chart: &ChartSpec) -> crate::Result<PathBuf> {
        let path = self.output_path(chart);

        let drawn = match (&chart.kind, &chart.series) {
            (ChartKind::Bar, Series::Categorical(points)) => draw_bar_chart(&path, chart, points),
            (ChartKind::HorizontalBar, Series::Categorical(points)) => {
                draw_horizontal_bar_chart(&path, chart, points)
            }
            (ChartKind::LineWithMarkers, Series::Hourly(points)) => {
                draw_hourly_chart(&path, chart, points)
            }
            (ChartKind::Line, Series::Daily(points)) => draw_daily_chart(&path, chart, points),
            (kind, _) => Err(format!("{kind:?} chart cannot plot this series").into()),
        };

        drawn.map_err(|e| AnalysisError::Render {
            chart: chart.name.to_string(),
            message: e.to_string(),
        })?;
        Ok(path)
    }
}

type DrawResult = std::result::Result<(), Box<dyn Error>>;

/// Upper bound of the count axis with some headroom
fn count_axis_max(series: &Series) -> usize {
    let max = series.max_count().max(1);
    max + max / 10 + 1
}

/// Index range giving exactly one axis slot per category
///
/// Segmented ranges include both ends, so `n` categories span `0..n-1`.
fn category_range(len: usize) -> Range<usize> {
    0..len.saturating_sub(1)
}

fn category_label(labels: &[String], value: &SegmentValue<usize>) -> String {
    match value {
        SegmentValue::CenterOf(idx) | SegmentValue::Exact(idx) => {
            labels.get(*idx).cloned().unwrap_or_default()
        }
        SegmentValue::Last => String::new(),
    }
}

fn draw_bar_chart(path: &Path, chart: &ChartSpec, points: &[(String, usize)]) -> DrawResult {
    let labels: Vec<String> = points.iter().map(|(name, _)| name.clone()).collect();

    let root = BitMapBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut ctx = ChartBuilder::on(&root)
        .caption(chart.title.as_str(), ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(120)
        .y_label_area_size(70)
        .build_cartesian_2d(
            category_range(labels.len()).into_segmented(),
            0usize..count_axis_max(&chart.series),
        )?;

    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len().max(1))
        .x_label_formatter(&|v| category_label(&labels, v))
        .x_label_style(
            ("sans-serif", 13)
                .into_font()
                .transform(FontTransform::Rotate270),
        )
        .x_desc(chart.x_label)
        .y_desc(chart.y_label)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    ctx.draw_series(
        Histogram::vertical(&ctx)
            .style(SKY_BLUE.filled())
            .margin(8)
            .data(points.iter().enumerate().map(|(idx, (_, count))| (idx, *count))),
    )?;

    root.present()?;
    Ok(())
}

fn draw_horizontal_bar_chart(path: &Path, chart: &ChartSpec, points: &[(String, usize)]) -> DrawResult {
    // Most frequent product on top
    let labels: Vec<String> = points.iter().rev().map(|(name, _)| name.clone()).collect();

    let root = BitMapBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut ctx = ChartBuilder::on(&root)
        .caption(chart.title.as_str(), ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(330)
        .build_cartesian_2d(
            0usize..count_axis_max(&chart.series),
            category_range(labels.len()).into_segmented(),
        )?;

    ctx.configure_mesh()
        .disable_y_mesh()
        .y_labels(labels.len().max(1))
        .y_label_formatter(&|v| category_label(&labels, v))
        .x_desc(chart.x_label)
        .y_desc(chart.y_label)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    ctx.draw_series(
        Histogram::horizontal(&ctx)
            .style(LIGHT_GREEN.filled())
            .margin(6)
            .data(points.iter().rev().enumerate().map(|(idx, (_, count))| (idx, *count))),
    )?;

    root.present()?;
    Ok(())
}

fn draw_hourly_chart(path: &Path, chart: &ChartSpec, points: &[(u32, usize)]) -> DrawResult {
    let root = BitMapBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    // The hour axis always spans the whole day.
    let mut ctx = ChartBuilder::on(&root)
        .caption(chart.title.as_str(), ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(0u32..23u32, 0usize..count_axis_max(&chart.series))?;

    ctx.configure_mesh()
        .x_labels(24)
        .x_desc(chart.x_label)
        .y_desc(chart.y_label)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    ctx.draw_series(LineSeries::new(points.iter().copied(), &LINE_BLUE))?;
    ctx.draw_series(
        points
            .iter()
            .map(|&(hour, count)| Circle::new((hour, count), 4, LINE_BLUE.filled())),
    )?;

    root.present()?;
    Ok(())
}

fn draw_daily_chart(path: &Path, chart: &ChartSpec, points: &[(NaiveDate, usize)]) -> DrawResult {
    let (Some(&(first, _)), Some(&(last, _))) = (points.first(), points.last()) else {
        return Err("no dated sales to plot".into());
    };
    let last = if last > first { last } else { first + Duration::days(1) };

    let root = BitMapBackend::new(path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut ctx = ChartBuilder::on(&root)
        .caption(chart.title.as_str(), ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(first..last, 0usize..count_axis_max(&chart.series))?;

    ctx.configure_mesh()
        .x_labels(12)
        .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m-%d").to_string())
        .x_desc(chart.x_label)
        .y_desc(chart.y_label)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    ctx.draw_series(LineSeries::new(points.iter().copied(), &LINE_BLUE))?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::DEFAULT_TOP_N;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn create_test_summary() -> SalesSummary {
        let day = NaiveDate::from_ymd_opt(2011, 12, 1).unwrap();
        SalesSummary {
            top_countries: vec![("United Kingdom".to_string(), 60), ("France".to_string(), 30)],
            top_products: vec![("WHITE METAL LANTERN".to_string(), 12)],
            sales_per_hour: BTreeMap::from([(9, 2), (14, 5)]),
            sales_per_day: BTreeMap::from([(day, 7)]),
            date_range: None,
            total_transactions: 7,
        }
    }

    /// Fails every other chart
    struct FlakyRenderer {
        calls: usize,
    }

    impl ChartRenderer for FlakyRenderer {
        fn render(&mut self, chart: &ChartSpec) -> crate::Result<PathBuf> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                Err(AnalysisError::Render {
                    chart: chart.name.to_string(),
                    message: "no display surface".to_string(),
                })
            } else {
                Ok(PathBuf::from(chart.name))
            }
        }
    }

    #[test]
    fn test_dashboard_charts() {
        let charts = dashboard_charts(&create_test_summary(), DEFAULT_TOP_N);
        let kinds: Vec<ChartKind> = charts.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ChartKind::Bar, ChartKind::HorizontalBar, ChartKind::LineWithMarkers, ChartKind::Line]
        );
        assert_eq!(charts[2].series, Series::Hourly(vec![(9, 2), (14, 5)]));
        assert_eq!(charts[0].series.len(), 2);
    }

    #[test]
    fn test_render_dashboard_continues_after_failure() {
        let mut renderer = FlakyRenderer { calls: 0 };
        let outcomes = render_dashboard(&mut renderer, &create_test_summary(), DEFAULT_TOP_N);

        assert_eq!(renderer.calls, 4);
        assert_eq!(outcomes.len(), 4);
        assert!(outcomes[0].result.is_ok());
        assert!(matches!(outcomes[1].result, Err(AnalysisError::Render { .. })));
        assert!(outcomes[2].result.is_ok());
        assert_eq!(outcomes[3].name, "sales_by_day");
    }

    #[test]
    fn test_plotters_renderer_missing_directory_is_render_error() {
        let temp_dir = tempdir().unwrap();
        let mut renderer = PlottersRenderer::new(temp_dir.path().join("does/not/exist"));
        let charts = dashboard_charts(&create_test_summary(), DEFAULT_TOP_N);

        let result = renderer.render(&charts[0]);
        assert!(matches!(result, Err(AnalysisError::Render { ref chart, .. }) if chart == "top_countries"));
    }

    #[test]
    fn test_mismatched_series_is_render_error() {
        let temp_dir = tempdir().unwrap();
        let mut renderer = PlottersRenderer::new(temp_dir.path());
        let mut chart = dashboard_charts(&create_test_summary(), DEFAULT_TOP_N).remove(0);
        chart.kind = ChartKind::Line;

        assert!(renderer.render(&chart).is_err());
    }

    #[test]
    fn test_output_path() {
        let renderer = PlottersRenderer::new("charts");
        let charts = dashboard_charts(&create_test_summary(), DEFAULT_TOP_N);
        assert_eq!(renderer.output_path(&charts[3]), PathBuf::from("charts/sales_by_day.png"));
    }

    #[test]
    fn test_titles_follow_top_n() {
        let charts = dashboard_charts(&create_test_summary(), 3);
        assert_eq!(charts[0].title, "Top 3 Countries by Number of Sales");
        assert_eq!(charts[1].title, "Top 3 Best-Selling Products");
        assert_eq!(charts[2].title, "Sales by Hour of the Day");
    }

    #[test]
    fn test_category_range_has_one_slot_per_entry() {
        for len in 1..=10 {
            let range = category_range(len);
            assert_eq!(range.start, 0);
            assert_eq!(range.end - range.start + 1, len);
        }
        assert_eq!(category_range(0), 0..0);
    }

    #[test]
    fn test_plotters_renderer_draws_every_chart() {
        let temp_dir = tempdir().unwrap();
        let mut renderer = PlottersRenderer::new(temp_dir.path());
        // Single-day series exercises the widened date axis.
        let summary = create_test_summary();
        assert_eq!(summary.sales_per_day.len(), 1);

        let outcomes = render_dashboard(&mut renderer, &summary, DEFAULT_TOP_N);

        assert_eq!(outcomes.len(), 4);
        for outcome in &outcomes {
            let path = outcome.result.as_ref().unwrap();
            assert_eq!(path, &temp_dir.path().join(format!("{}.png", outcome.name)));
            let size = std::fs::metadata(path).unwrap().len();
            assert!(size > 0, "{} is empty", path.display());
        }
    }

    #[test]
    fn test_count_axis_has_headroom() {
        assert_eq!(count_axis_max(&Series::Hourly(vec![])), 2);
        assert_eq!(count_axis_max(&Series::Hourly(vec![(1, 100)])), 111);
    }
}
