//! Schema normalization.
//!
//! This module turns raw text rows from either source into typed records that
//! are safe to filter and join.
//!
//! Design goals:
//! - **Row-level validation** (drop bad rows, but report what happened)
//! - **One calendar type** downstream (no string dates past this point)
//! - **Join-stable keys** (country codes upper-cased, labels lower-cased)
//! - **Separation of concerns**: no filtering or scoring here

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::domain::{
    InflationRecord, Month, ProductPriceRecord, RawInflationRow, RawPriceRow, SourceTag,
    normalize_country, normalize_label,
};

/// Brand recorded for products that arrive without one.
pub const UNKNOWN_BRAND: &str = "unknown";

/// Accepted textual date formats, tried in order.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Why a raw row was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RejectReason {
    MissingField(&'static str),
    InvalidDate(&'static str),
    InvalidNumber(&'static str),
    NegativePrice,
    Duplicate,
}

impl RejectReason {
    /// Stable code used as a counter key in quality metrics.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::MissingField(_) => "missing_field",
            RejectReason::InvalidDate(_) => "invalid_date",
            RejectReason::InvalidNumber(_) => "invalid_number",
            RejectReason::NegativePrice => "negative_price",
            RejectReason::Duplicate => "duplicate",
        }
    }

    /// The field that triggered the rejection.
    pub fn field(&self) -> &'static str {
        match self {
            RejectReason::MissingField(f)
            | RejectReason::InvalidDate(f)
            | RejectReason::InvalidNumber(f) => f,
            RejectReason::NegativePrice => "price",
            // Duplicates are keyed on the identity columns; report the id.
            RejectReason::Duplicate => "key",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MissingField(field) => write!(f, "missing {field}"),
            RejectReason::InvalidDate(field) => write!(f, "unparsable date in {field}"),
            RejectReason::InvalidNumber(field) => write!(f, "non-numeric {field}"),
            RejectReason::NegativePrice => write!(f, "negative price"),
            RejectReason::Duplicate => write!(f, "duplicate key"),
        }
    }
}

/// A dropped row: its position in the raw batch, its key if one could be
/// read, and every problem found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    pub index: usize,
    pub key: Option<String>,
    pub reasons: Vec<RejectReason>,
}

/// Normalizer output: typed rows + rejections + counts.
#[derive(Debug, Clone)]
pub struct Normalized<T> {
    pub rows: Vec<T>,
    pub rejections: Vec<RowRejection>,
    pub rows_read: usize,
    pub source: SourceTag,
}

impl<T> Normalized<T> {
    pub fn rejected(&self) -> usize {
        self.rejections.len()
    }

    pub fn rows_used(&self) -> usize {
        self.rows.len()
    }
}

pub fn normalize_inflation(raw: &[RawInflationRow], source: SourceTag) -> Normalized<InflationRecord> {
    normalize_batch(raw, source, normalize_inflation_row, |r: &InflationRecord| {
        format!("{}/{}/{}", r.country, r.category, r.period)
    })
}

pub fn normalize_products(raw: &[RawPriceRow], source: SourceTag) -> Normalized<ProductPriceRecord> {
    normalize_batch(raw, source, normalize_price_row, |r: &ProductPriceRecord| {
        format!("{}@{}", r.product_id, r.observed_date)
    })
}

fn normalize_batch<R, T>(
    raw: &[R],
    source: SourceTag,
    normalize_row: fn(&R, SourceTag) -> Result<T, (Option<String>, Vec<RejectReason>)>,
    unique_key: fn(&T) -> String,
) -> Normalized<T> {
    let mut rows = Vec::with_capacity(raw.len());
    let mut rejections = Vec::new();
    let mut seen = HashSet::with_capacity(raw.len());

    for (index, row) in raw.iter().enumerate() {
        match normalize_row(row, source) {
            Ok(record) => {
                let key = unique_key(&record);
                if seen.insert(key.clone()) {
                    rows.push(record);
                } else {
                    rejections.push(RowRejection {
                        index,
                        key: Some(key),
                        reasons: vec![RejectReason::Duplicate],
                    });
                }
            }
            Err((key, reasons)) => {
                debug!(index, key = ?key, ?reasons, "Rejected raw row");
                rejections.push(RowRejection { index, key, reasons });
            }
        }
    }

    if !rejections.is_empty() {
        info!(
            rows_read = raw.len(),
            rejected = rejections.len(),
            %source,
            "Normalization dropped rows"
        );
    }

    Normalized {
        rows,
        rejections,
        rows_read: raw.len(),
        source,
    }
}

fn normalize_inflation_row(
    row: &RawInflationRow,
    source: SourceTag,
) -> Result<InflationRecord, (Option<String>, Vec<RejectReason>)> {
    let mut reasons = Vec::new();

    let country = required(&row.country, "country", &mut reasons).map(|c| normalize_country(&c));
    let category = required(&row.category, "category", &mut reasons).map(|c| normalize_label(&c));
    let period = required(&row.period, "period", &mut reasons).and_then(|p| {
        let parsed = parse_period(&p);
        if parsed.is_none() {
            reasons.push(RejectReason::InvalidDate("period"));
        }
        parsed
    });
    let rate = required(&row.rate, "rate", &mut reasons).and_then(|r| {
        let parsed = parse_number(&r);
        if parsed.is_none() {
            reasons.push(RejectReason::InvalidNumber("rate"));
        }
        parsed
    });

    match (country, category, period, rate) {
        (Some(country), Some(category), Some(period), Some(rate)) => Ok(InflationRecord {
            country,
            category,
            period,
            rate,
            source,
        }),
        (country, category, _, _) => {
            let key = country.zip(category).map(|(c, k)| format!("{c}/{k}"));
            Err((key, reasons))
        }
    }
}

fn normalize_price_row(
    row: &RawPriceRow,
    source: SourceTag,
) -> Result<ProductPriceRecord, (Option<String>, Vec<RejectReason>)> {
    let mut reasons = Vec::new();

    let product_id = required(&row.product_id, "product_id", &mut reasons);
    let brand = optional(&row.brand)
        .map(|b| normalize_label(&b))
        .unwrap_or_else(|| UNKNOWN_BRAND.to_string());
    let category = required(&row.category, "category", &mut reasons).map(|c| normalize_label(&c));
    let country = required(&row.country, "country", &mut reasons).map(|c| normalize_country(&c));
    let observed_date = required(&row.observed_date, "observed_date", &mut reasons).and_then(|d| {
        let parsed = parse_date(&d);
        if parsed.is_none() {
            reasons.push(RejectReason::InvalidDate("observed_date"));
        }
        parsed
    });
    let price = required(&row.price, "price", &mut reasons).and_then(|p| match parse_number(&p) {
        None => {
            reasons.push(RejectReason::InvalidNumber("price"));
            None
        }
        Some(v) if v < 0.0 => {
            reasons.push(RejectReason::NegativePrice);
            None
        }
        Some(v) => Some(v),
    });
    let currency = required(&row.currency, "currency", &mut reasons).map(|c| c.to_uppercase());

    match (product_id, category, country, observed_date, price, currency) {
        (
            Some(product_id),
            Some(category),
            Some(country),
            Some(observed_date),
            Some(price),
            Some(currency),
        ) => Ok(ProductPriceRecord {
            product_id,
            brand,
            category,
            country,
            observed_date,
            price,
            currency,
            source,
        }),
        (product_id, ..) => Err((product_id, reasons)),
    }
}

/// Trimmed, non-empty text.
fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required(
    value: &Option<String>,
    field: &'static str,
    reasons: &mut Vec<RejectReason>,
) -> Option<String> {
    let out = optional(value);
    if out.is_none() {
        reasons.push(RejectReason::MissingField(field));
    }
    out
}

/// Parse a calendar date from any accepted format.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }

    // Compact `YYYYMMDD`.
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        let year = raw[0..4].parse().ok()?;
        let month = raw[4..6].parse().ok()?;
        let day = raw[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|ts| ts.date())
}

/// Parse a calendar month: any accepted date, or `YYYY-MM` / `YYYY/MM`.
pub fn parse_period(raw: &str) -> Option<Month> {
    let raw = raw.trim();
    if let Some(date) = parse_date(raw) {
        return Some(Month::of(date));
    }

    let (year, month) = raw.split_once('-').or_else(|| raw.split_once('/'))?;
    if year.len() != 4 {
        return None;
    }
    Month::new(year.parse().ok()?, month.parse().ok()?)
}

/// Parse a finite decimal; a lone `,` is read as the decimal separator.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let value = if trimmed.contains(',') && !trimmed.contains('.') {
        trimmed.replace(',', ".").parse::<f64>().ok()?
    } else {
        trimmed.parse::<f64>().ok()?
    };
    value.is_finite().then_some(value)
}
