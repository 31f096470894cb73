//! Shared domain types.
//!
//! Raw rows come out of a source as optional text fields. Everything past
//! `io::ingest` is typed: dates are `NaiveDate`/`Month`, numbers are `f64`,
//! and every record carries the `SourceTag` it was fetched with.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};

use crate::domain::vocabulary::{normalize_country, normalize_label};

/// Which of the two datasets a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Inflation,
    Product,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 2] = [DatasetKind::Inflation, DatasetKind::Product];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            DatasetKind::Inflation => "Inflation",
            DatasetKind::Product => "Product prices",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Inflation => write!(f, "inflation"),
            DatasetKind::Product => write!(f, "product"),
        }
    }
}

/// Provenance of a record: fetched from the warehouse, or generated locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    Live,
    Synthetic,
}

impl SourceTag {
    pub fn label(self) -> &'static str {
        match self {
            SourceTag::Live => "live",
            SourceTag::Synthetic => "synthetic",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A calendar month, stored as its first day.
///
/// Months order chronologically and display as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Month(NaiveDate);

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Month)
    }

    /// The month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Month(date.with_day(1).unwrap_or(date))
    }

    pub fn first_day(self) -> NaiveDate {
        self.0
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    /// The following calendar month.
    pub fn succ(self) -> Option<Self> {
        let (y, m) = if self.month() == 12 {
            (self.year() + 1, 1)
        } else {
            (self.year(), self.month() + 1)
        };
        Month::new(y, m)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Inflation row as delivered by a source, before coercion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RawInflationRow {
    pub country: Option<String>,
    pub category: Option<String>,
    pub period: Option<String>,
    pub rate: Option<String>,
}

/// Product-price row as delivered by a source, before coercion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RawPriceRow {
    pub product_id: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub country: Option<String>,
    pub observed_date: Option<String>,
    pub price: Option<String>,
    pub currency: Option<String>,
}

/// A normalized inflation observation. Unique per (country, category, period).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InflationRecord {
    pub country: String,
    pub category: String,
    pub period: Month,
    /// Year-over-year rate in percent.
    pub rate: f64,
    pub source: SourceTag,
}

/// A normalized price observation. Unique per (product_id, observed_date).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductPriceRecord {
    pub product_id: String,
    pub brand: String,
    pub category: String,
    pub country: String,
    pub observed_date: NaiveDate,
    pub price: f64,
    pub currency: String,
    pub source: SourceTag,
}

/// Dimensions shared by both record kinds.
///
/// Filtering and quality assessment only look at rows through this trait.
pub trait Observation {
    fn country(&self) -> &str;
    fn category(&self) -> &str;
    /// Brand, for datasets that have one.
    fn brand(&self) -> Option<&str> {
        None
    }
    /// The calendar date used for range filters and freshness.
    fn date(&self) -> NaiveDate;
    fn source(&self) -> SourceTag;
}

impl Observation for InflationRecord {
    fn country(&self) -> &str {
        &self.country
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn date(&self) -> NaiveDate {
        self.period.first_day()
    }

    fn source(&self) -> SourceTag {
        self.source
    }
}

impl Observation for ProductPriceRecord {
    fn country(&self) -> &str {
        &self.country
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn brand(&self) -> Option<&str> {
        Some(&self.brand)
    }

    fn date(&self) -> NaiveDate {
        self.observed_date
    }

    fn source(&self) -> SourceTag {
        self.source
    }
}

/// Inclusive calendar date interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Returns `None` when `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Smallest range covering every row, or `None` for no rows.
    pub fn observed<T: Observation>(rows: &[T]) -> Option<Self> {
        let start = rows.iter().map(Observation::date).min()?;
        let end = rows.iter().map(Observation::date).max()?;
        Some(Self { start, end })
    }
}

/// User-selected predicates. Empty sets mean "all"; no range means the full
/// observed range.
///
/// Values are stored normalized, so `"us "` and `"US"` select the same rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterCriteria {
    pub countries: BTreeSet<String>,
    pub categories: BTreeSet<String>,
    pub brands: BTreeSet<String>,
    pub date_range: Option<DateRange>,
}

impl FilterCriteria {
    pub fn with_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.countries = countries
            .into_iter()
            .map(|c| normalize_country(c.as_ref()))
            .filter(|c| !c.is_empty())
            .collect();
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.categories = categories
            .into_iter()
            .map(|c| normalize_label(c.as_ref()))
            .filter(|c| !c.is_empty())
            .collect();
        self
    }

    pub fn with_brands<I, S>(mut self, brands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.brands = brands
            .into_iter()
            .map(|b| normalize_label(b.as_ref()))
            .filter(|b| !b.is_empty())
            .collect();
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    /// True when no predicate restricts anything.
    pub fn is_unrestricted(&self) -> bool {
        self.countries.is_empty()
            && self.categories.is_empty()
            && self.brands.is_empty()
            && self.date_range.is_none()
    }
}

/// Per-dataset quality metrics for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub dataset: DatasetKind,
    pub source: SourceTag,
    /// Fraction of raw rows that survived normalization, in `[0, 1]`.
    pub completeness_ratio: f64,
    /// Days between the reference date and the newest row; `None` when unknown.
    pub freshness_days: Option<i64>,
    /// Fraction of rows whose country and category are in the vocabulary.
    pub consistency_score: f64,
    pub flagged_fields: BTreeSet<String>,

    pub total_rows: usize,
    pub rejected_rows: usize,
    pub out_of_vocabulary_rows: usize,
    /// Rejection counts keyed by reason code (`invalid_date`, `duplicate`, ...).
    pub reject_reasons: BTreeMap<String, usize>,
}

impl QualityMetrics {
    pub fn reason_count(&self, code: &str) -> usize {
        self.reject_reasons.get(code).copied().unwrap_or(0)
    }

    pub fn duplicate_rows(&self) -> usize {
        self.reason_count("duplicate")
    }

    pub fn negative_prices(&self) -> usize {
        self.reason_count("negative_price")
    }

    /// PASS/FAIL check: both ratios at or above `min_ratio`.
    pub fn passed(&self, min_ratio: f64) -> bool {
        self.completeness_ratio >= min_ratio && self.consistency_score >= min_ratio
    }
}

/// One aligned (period, country, category) comparison entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonPoint {
    pub period: Month,
    pub country: String,
    pub category: String,
    pub avg_price: f64,
    /// Percent change versus the previous observed month of the same
    /// (country, category); with gaps this may be more than one month back.
    pub avg_price_change_pct: Option<f64>,
    /// `None` when no inflation row exists for this key.
    pub inflation_rate_pct: Option<f64>,
    pub price_source: SourceTag,
    pub inflation_source: Option<SourceTag>,
    pub product_count: usize,
}

/// Ordered by period, then country, then category.
pub type ComparisonSeries = Vec<ComparisonPoint>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_of_date_truncates_to_first_day() {
        let d = NaiveDate::from_ymd_opt(2023, 3, 17).unwrap();
        let m = Month::of(d);
        assert_eq!(m.first_day(), NaiveDate::from_ymd_opt(2023, 3, 1).unwrap());
        assert_eq!(m.to_string(), "2023-03");
    }

    #[test]
    fn month_succ_rolls_over_year() {
        let dec = Month::new(2022, 12).unwrap();
        assert_eq!(dec.succ(), Month::new(2023, 1));
    }

    #[test]
    fn date_range_rejects_inverted_bounds() {
        let a = NaiveDate::from_ymd_opt(2023, 3, 31).unwrap();
        let b = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        assert!(DateRange::new(a, b).is_none());
        let r = DateRange::new(b, a).unwrap();
        assert!(r.contains(a) && r.contains(b));
    }

    #[test]
    fn criteria_values_are_normalized() {
        let c = FilterCriteria::default()
            .with_countries(["de ", "Fr"])
            .with_categories(["  Dairy   Products "]);
        assert!(c.countries.contains("DE"));
        assert!(c.countries.contains("FR"));
        assert!(c.categories.contains("dairy products"));
        assert!(!c.is_unrestricted());
        assert!(FilterCriteria::default().is_unrestricted());
    }
}
