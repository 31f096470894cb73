//! Formatted terminal output.
//!
//! We keep formatting code in one place so the pipeline stays free of
//! presentation concerns and output changes are localized.

use crate::data::ConnectionStatus;
use crate::domain::{ComparisonPoint, DatasetKind, QualityMetrics};
use crate::report::{InflationSummary, ProductSummary};

/// Header plus one status line per dataset, and a banner when any dataset
/// is synthetic.
pub fn format_status(status: &ConnectionStatus) -> String {
    let mut out = String::new();
    out.push_str("=== pricewatch - Price vs Inflation ===\n");
    for kind in DatasetKind::ALL {
        out.push_str(&format!(
            "{:<15} {}\n",
            format!("{}:", kind.display_name()),
            status.status(kind).describe()
        ));
    }
    if DatasetKind::ALL.iter().any(|&kind| !status.is_live(kind)) {
        out.push_str("[!] Sample data in use: figures are illustrative, not observed.\n");
    }
    out
}

/// Quality table with a PASS/FAIL column against `min_ratio`.
pub fn format_quality(metrics: &[QualityMetrics], min_ratio: f64) -> String {
    let mut out = String::new();
    out.push_str("Data quality:\n");
    out.push_str(
        format!(
            "{:<15} {:<10} {:>8} {:>9} {:>6} {:>5} {:>13} {:>11} {:>6}  {}\n",
            "dataset", "source", "rows", "rejected", "dupes", "neg", "completeness", "consistency", "age", "status"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<15} {:-<10} {:->8} {:->9} {:->6} {:->5} {:->13} {:->11} {:->6}  {:-<6}\n",
            "", "", "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for m in metrics {
        let age = m
            .freshness_days
            .map(|d| format!("{d}d"))
            .unwrap_or_else(|| "?".to_string());
        let status = if m.passed(min_ratio) { "PASS" } else { "FAIL" };
        out.push_str(&format!(
            "{:<15} {:<10} {:>8} {:>9} {:>6} {:>5} {:>12.1}% {:>10.1}% {:>6}  {}\n",
            m.dataset.display_name(),
            m.source.label(),
            m.total_rows,
            m.rejected_rows,
            m.duplicate_rows(),
            m.negative_prices(),
            m.completeness_ratio * 100.0,
            m.consistency_score * 100.0,
            age,
            status,
        ));
    }

    for m in metrics {
        if m.flagged_fields.is_empty() {
            continue;
        }
        let fields: Vec<&str> = m.flagged_fields.iter().map(String::as_str).collect();
        let reasons: Vec<String> = m
            .reject_reasons
            .iter()
            .map(|(code, n)| format!("{code}={n}"))
            .collect();
        out.push_str(&format!(
            "  {} flagged: {}{}\n",
            m.dataset,
            fields.join(", "),
            if reasons.is_empty() {
                String::new()
            } else {
                format!(" ({})", reasons.join(", "))
            }
        ));
    }
    out
}

/// Inflation and product headline figures.
pub fn format_summary(inflation: Option<&InflationSummary>, products: Option<&ProductSummary>) -> String {
    let mut out = format_inflation_summary(inflation);
    out.push_str(&format_product_summary(products));
    out
}

fn format_inflation_summary(summary: Option<&InflationSummary>) -> String {
    let Some(s) = summary else {
        return "Inflation summary: no rows match the current filters.\n".to_string();
    };
    let mut out = String::new();
    out.push_str("Inflation summary:\n");
    out.push_str(&format!(
        "- latest average ({}, {} countries): {:.2}%\n",
        s.latest_period, s.countries, s.latest_avg_rate
    ));
    out.push_str(&format!(
        "- highest: {:.2}% {} {} ({})\n",
        s.highest.rate, s.highest.country, s.highest.category, s.highest.period
    ));
    out.push_str(&format!(
        "- lowest : {:.2}% {} {} ({})\n",
        s.lowest.rate, s.lowest.country, s.lowest.category, s.lowest.period
    ));
    out
}

fn format_product_summary(summary: Option<&ProductSummary>) -> String {
    let Some(s) = summary else {
        return "Product summary: no rows match the current filters.\n".to_string();
    };
    let mut out = String::new();
    out.push_str(&format!(
        "Product summary ({} products, {} observations, {} to {}):\n",
        s.products, s.observations, s.observed.start, s.observed.end
    ));
    out.push_str(&format!("- avg price      : {:.2}\n", s.avg_price));
    out.push_str(&format!(
        "- avg inflation  : {} over {} matched points\n",
        fmt_pct(s.avg_inflation_rate),
        s.matched_points
    ));
    out.push_str(&format!("- avg deviation  : {} (price change - inflation)\n", fmt_pct(s.avg_deviation)));
    out
}

/// Comparison table, showing at most `limit` rows (0 = all).
pub fn format_series(series: &[ComparisonPoint], limit: usize) -> String {
    if series.is_empty() {
        return "No comparison rows match the current filters.\n".to_string();
    }

    let mut out = String::new();
    out.push_str(
        format!(
            "{:<8} {:<7} {:<20} {:>10} {:>10} {:>10} {:>5}\n",
            "period", "country", "category", "avg_price", "price_chg", "inflation", "n"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<8} {:-<7} {:-<20} {:->10} {:->10} {:->10} {:->5}\n",
            "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    let shown = if limit == 0 { series.len() } else { limit.min(series.len()) };
    for p in &series[..shown] {
        out.push_str(
            format!(
                "{:<8} {:<7} {:<20} {:>10.2} {:>10} {:>10} {:>5}\n",
                p.period.to_string(),
                p.country,
                truncate(&p.category, 20),
                p.avg_price,
                fmt_pct(p.avg_price_change_pct),
                fmt_pct(p.inflation_rate_pct),
                p.product_count,
            )
            .trim_end(),
        );
        out.push('\n');
    }
    if shown < series.len() {
        out.push_str(&format!("... {} more rows\n", series.len() - shown));
    }
    out
}

fn fmt_pct(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.2}%"),
        None => "-".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;
    use crate::data::FetchStatus;
    use crate::domain::{Month, SourceTag};
    use crate::error::SourceError;

    fn point(chg: Option<f64>, rate: Option<f64>) -> ComparisonPoint {
        ComparisonPoint {
            period: Month::new(2023, 1).unwrap(),
            country: "DE".into(),
            category: "sugar, jam, honey, chocolate and confectionery".into(),
            avg_price: 2.5,
            avg_price_change_pct: chg,
            inflation_rate_pct: rate,
            price_source: SourceTag::Synthetic,
            inflation_source: None,
            product_count: 3,
        }
    }

    #[test]
    fn status_banner_appears_for_synthetic_data() {
        let degraded = ConnectionStatus {
            inflation: FetchStatus::Live,
            product: FetchStatus::Degraded(SourceError::Timeout(15)),
        };
        let text = format_status(&degraded);
        assert!(text.contains("timed out after 15s"));
        assert!(text.contains("[!]"));

        let live = ConnectionStatus {
            inflation: FetchStatus::Live,
            product: FetchStatus::Live,
        };
        assert!(!format_status(&live).contains("[!]"));
    }

    #[test]
    fn series_table_marks_missing_values_and_truncates() {
        let series = vec![point(None, Some(3.25)), point(Some(-1.5), None)];
        let text = format_series(&series, 1);
        assert!(text.contains("3.25%"));
        assert!(text.contains("sugar, jam, honey, ."));
        assert!(text.contains("... 1 more rows"));
        assert!(format_series(&[], 10).contains("No comparison rows"));
    }

    #[test]
    fn quality_table_reports_pass_fail() {
        let metrics = QualityMetrics {
            dataset: DatasetKind::Product,
            source: SourceTag::Live,
            completeness_ratio: 0.5,
            freshness_days: None,
            consistency_score: 1.0,
            flagged_fields: BTreeSet::from(["price".to_string()]),
            total_rows: 2,
            rejected_rows: 1,
            out_of_vocabulary_rows: 0,
            reject_reasons: BTreeMap::from([("negative_price".to_string(), 1)]),
        };
        let text = format_quality(&[metrics], 0.95);
        assert!(text.contains("FAIL"));
        assert!(text.contains("dupes"));
        let row = text.lines().find(|l| l.starts_with("Product prices")).unwrap();
        let cells: Vec<&str> = row.split_whitespace().collect();
        // rows, rejected, dupes, neg
        assert_eq!(&cells[3..7], ["2", "1", "0", "1"]);
        assert!(text.contains("product flagged: price (negative_price=1)"));
    }

    #[test]
    fn summary_lists_both_datasets() {
        let products = ProductSummary {
            products: 2,
            observations: 5,
            avg_price: 1.5,
            avg_inflation_rate: Some(4.0),
            avg_deviation: None,
            matched_points: 3,
            observed: crate::domain::DateRange::new(
                chrono::NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                chrono::NaiveDate::from_ymd_opt(2023, 3, 31).unwrap(),
            )
            .unwrap(),
        };
        let text = format_summary(None, Some(&products));
        assert!(text.contains("Inflation summary: no rows"));
        assert!(text.contains("2 products, 5 observations, 2023-01-01 to 2023-03-31"));
        assert!(text.contains("avg price      : 1.50"));
        assert!(text.contains("4.00% over 3 matched points"));
        assert!(format_summary(None, None).contains("Product summary: no rows"));
    }
}
