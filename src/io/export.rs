//! Export a pipeline report.
//!
//! - the comparison series as CSV, one row per (period, country, category)
//! - the whole report as JSON (sources, criteria, quality, summary, series)

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::app::pipeline::PipelineReport;
use crate::domain::{ComparisonPoint, DatasetKind, FilterCriteria, QualityMetrics, SourceTag};
use crate::error::AppError;
use crate::report::{InflationSummary, ProductSummary};

/// Write the comparison series to a CSV file.
///
/// Missing values (no previous bucket, no inflation row) are empty cells.
pub fn write_comparison_csv(path: &Path, series: &[ComparisonPoint]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    for point in series {
        writer
            .serialize(point)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;

    Ok(())
}

#[derive(Debug, Serialize)]
struct SourceEntry {
    dataset: DatasetKind,
    source: SourceTag,
    status: String,
    /// Rows left after filtering.
    rows: usize,
}

#[derive(Debug, Serialize)]
struct ReportFile<'a> {
    tool: &'static str,
    sources: Vec<SourceEntry>,
    criteria: &'a FilterCriteria,
    quality: [&'a QualityMetrics; 2],
    inflation_summary: Option<&'a InflationSummary>,
    product_summary: Option<&'a ProductSummary>,
    series: &'a [ComparisonPoint],
}

/// Write the full report to a JSON file.
pub fn write_report_json(path: &Path, report: &PipelineReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create report JSON '{}': {e}", path.display())))?;

    let sources = DatasetKind::ALL
        .into_iter()
        .map(|kind| SourceEntry {
            dataset: kind,
            source: report.status.source_tag(kind),
            status: report.status.status(kind).describe(),
            rows: match kind {
                DatasetKind::Inflation => report.inflation_rows,
                DatasetKind::Product => report.product_rows,
            },
        })
        .collect();

    let out = ReportFile {
        tool: "pricewatch",
        sources,
        criteria: &report.criteria,
        quality: report.quality(),
        inflation_summary: report.inflation_summary.as_ref(),
        product_summary: report.product_summary.as_ref(),
        series: &report.series,
    };

    serde_json::to_writer_pretty(file, &out)
        .map_err(|e| AppError::new(2, format!("Failed to write report JSON: {e}")))?;

    Ok(())
}
