//! Reporting utilities: inflation summary and formatted terminal output.

use serde::Serialize;

use crate::domain::{ComparisonPoint, DateRange, InflationRecord, Month, ProductPriceRecord};

pub mod format;

pub use format::{format_quality, format_series, format_status, format_summary};

/// A single extreme observation (highest or lowest rate).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateExtreme {
    pub country: String,
    pub category: String,
    pub period: Month,
    pub rate: f64,
}

/// Headline inflation figures over a set of rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InflationSummary {
    pub latest_period: Month,
    /// Mean rate across all rows of the latest period.
    pub latest_avg_rate: f64,
    pub highest: RateExtreme,
    pub lowest: RateExtreme,
    pub countries: usize,
}

/// Summarize inflation rows; `None` when there are none.
pub fn summarize_inflation(rows: &[InflationRecord]) -> Option<InflationSummary> {
    let latest_period = rows.iter().map(|r| r.period).max()?;

    let (sum, n) = rows
        .iter()
        .filter(|r| r.period == latest_period)
        .fold((0.0, 0usize), |(s, n), r| (s + r.rate, n + 1));

    // Ties resolve to the earliest row in input order.
    let highest = rows
        .iter()
        .reduce(|best, r| if r.rate > best.rate { r } else { best })?;
    let lowest = rows
        .iter()
        .reduce(|best, r| if r.rate < best.rate { r } else { best })?;

    let mut countries: Vec<&str> = rows.iter().map(|r| r.country.as_str()).collect();
    countries.sort_unstable();
    countries.dedup();

    Some(InflationSummary {
        latest_period,
        latest_avg_rate: sum / n as f64,
        highest: extreme(highest),
        lowest: extreme(lowest),
        countries: countries.len(),
    })
}

fn extreme(r: &InflationRecord) -> RateExtreme {
    RateExtreme {
        country: r.country.clone(),
        category: r.category.clone(),
        period: r.period,
        rate: r.rate,
    }
}

/// Headline product figures for the filtered view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSummary {
    /// Distinct product ids.
    pub products: usize,
    pub observations: usize,
    pub avg_price: f64,
    /// Mean joined inflation rate over comparison points that have one.
    pub avg_inflation_rate: Option<f64>,
    /// Mean of (price change - inflation rate) in percentage points, over
    /// points carrying both values.
    pub avg_deviation: Option<f64>,
    /// Comparison points with a joined inflation rate.
    pub matched_points: usize,
    pub observed: DateRange,
}

/// Summarize product rows and their comparison series; `None` without rows.
pub fn summarize_products(rows: &[ProductPriceRecord], series: &[ComparisonPoint]) -> Option<ProductSummary> {
    let observed = DateRange::observed(rows)?;

    let mut ids: Vec<&str> = rows.iter().map(|r| r.product_id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();

    let avg_price = rows.iter().map(|r| r.price).sum::<f64>() / rows.len() as f64;
    let rates: Vec<f64> = series.iter().filter_map(|p| p.inflation_rate_pct).collect();
    let deviations: Vec<f64> = series
        .iter()
        .filter_map(|p| Some(p.avg_price_change_pct? - p.inflation_rate_pct?))
        .collect();

    Some(ProductSummary {
        products: ids.len(),
        observations: rows.len(),
        avg_price,
        avg_inflation_rate: mean(&rates),
        avg_deviation: mean(&deviations),
        matched_points: rates.len(),
        observed,
    })
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
