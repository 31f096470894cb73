//! Shared pipeline logic used by every CLI command.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! fetch -> normalize -> {quality, filter} -> aggregate
//!
//! The commands can then focus on presentation (printing vs exporting).

use std::rc::Rc;
use std::time::Duration;

use chrono::{Local, NaiveDate};

use crate::aggregate::aggregate;
use crate::app::session::Session;
use crate::data::{ConnectionStatus, DEFAULT_SEED, SourceAdapter};
use crate::domain::{
    ComparisonSeries, DatasetKind, FilterCriteria, InflationRecord, ProductPriceRecord,
    QualityMetrics, ReferenceVocabulary,
};
use crate::filter;
use crate::io::ingest::Normalized;
use crate::quality::assess_normalized;
use crate::report::{InflationSummary, ProductSummary, summarize_inflation, summarize_products};

/// Default bound on a live warehouse request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Ratio both quality scores must reach for a PASS.
pub const DEFAULT_MIN_QUALITY: f64 = 0.95;

/// Settings that shape a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub seed: u64,
    pub timeout: Duration,
    /// Reference date for freshness.
    pub today: NaiveDate,
    pub vocabulary: ReferenceVocabulary,
    pub min_quality: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            timeout: DEFAULT_TIMEOUT,
            today: Local::now().date_naive(),
            vocabulary: ReferenceVocabulary::default(),
            min_quality: DEFAULT_MIN_QUALITY,
        }
    }
}

/// Normalized rows for both datasets, plus how they were obtained.
///
/// Snapshots are immutable; each filter request reads from one.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub status: ConnectionStatus,
    pub inflation: Rc<Normalized<InflationRecord>>,
    pub products: Rc<Normalized<ProductPriceRecord>>,
}

/// Everything the presentation layer receives for one request.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub status: ConnectionStatus,
    pub criteria: FilterCriteria,
    pub series: ComparisonSeries,
    pub inflation_quality: QualityMetrics,
    pub product_quality: QualityMetrics,
    pub inflation_summary: Option<InflationSummary>,
    pub product_summary: Option<ProductSummary>,
    pub inflation_rows: usize,
    pub product_rows: usize,
}

impl PipelineReport {
    pub fn quality(&self) -> [&QualityMetrics; 2] {
        [&self.inflation_quality, &self.product_quality]
    }
}

/// Run the whole pipeline once, without keeping a session.
pub fn run_pipeline(
    adapter: &SourceAdapter,
    criteria: &FilterCriteria,
    config: &PipelineConfig,
) -> PipelineReport {
    let mut session = Session::new(config.clone());
    session.query(adapter, criteria).clone()
}

/// Score, filter, and aggregate a snapshot.
pub fn build_report(
    snapshot: &Snapshot,
    criteria: &FilterCriteria,
    config: &PipelineConfig,
) -> PipelineReport {
    let inflation_quality = assess_normalized(
        DatasetKind::Inflation,
        &snapshot.inflation,
        &config.vocabulary,
        config.today,
    );
    let product_quality = assess_normalized(
        DatasetKind::Product,
        &snapshot.products,
        &config.vocabulary,
        config.today,
    );

    let inflation = filter::apply(&snapshot.inflation.rows, criteria);
    let products = filter::apply(&snapshot.products.rows, criteria);
    let series = aggregate(&inflation.rows, &products.rows);

    PipelineReport {
        status: snapshot.status.clone(),
        criteria: criteria.clone(),
        inflation_summary: summarize_inflation(&inflation.rows),
        product_summary: summarize_products(&products.rows, &series),
        inflation_rows: inflation.rows.len(),
        product_rows: products.rows.len(),
        series,
        inflation_quality,
        product_quality,
    }
}
