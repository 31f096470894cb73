//! Data-quality scoring: completeness, freshness, and consistency.
//!
//! Everything here is a pure function of its inputs. The reference date is
//! passed in rather than read from the clock so runs are reproducible.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::domain::{DatasetKind, Observation, QualityMetrics, ReferenceVocabulary, SourceTag};
use crate::io::ingest::{Normalized, RowRejection};

/// Score one dataset.
///
/// `rejections` are the rows dropped by the normalizer and `total_raw_count`
/// is the number of raw rows it was given.
pub fn assess<T: Observation>(
    dataset: DatasetKind,
    source: SourceTag,
    rows: &[T],
    rejections: &[RowRejection],
    total_raw_count: usize,
    vocabulary: &ReferenceVocabulary,
    today: NaiveDate,
) -> QualityMetrics {
    let rejected = rejections.len();

    let mut flagged_fields = BTreeSet::new();
    let mut reject_reasons: BTreeMap<String, usize> = BTreeMap::new();
    for rejection in rejections {
        for reason in &rejection.reasons {
            flagged_fields.insert(reason.field().to_string());
            *reject_reasons.entry(reason.code().to_string()).or_default() += 1;
        }
    }

    let mut out_of_vocabulary = 0usize;
    for row in rows {
        let known_country = vocabulary.contains_country(row.country());
        let known_category = vocabulary.contains_category(row.category());
        if !known_country {
            flagged_fields.insert("country".to_string());
        }
        if !known_category {
            flagged_fields.insert("category".to_string());
        }
        if !(known_country && known_category) {
            out_of_vocabulary += 1;
        }
    }

    QualityMetrics {
        dataset,
        source,
        completeness_ratio: completeness_ratio(total_raw_count, rejected),
        freshness_days: freshness_days(rows, today),
        consistency_score: ratio(rows.len() - out_of_vocabulary, rows.len()),
        flagged_fields,
        total_rows: total_raw_count,
        rejected_rows: rejected,
        out_of_vocabulary_rows: out_of_vocabulary,
        reject_reasons,
    }
}

/// Score a normalizer output directly.
pub fn assess_normalized<T: Observation>(
    dataset: DatasetKind,
    normalized: &Normalized<T>,
    vocabulary: &ReferenceVocabulary,
    today: NaiveDate,
) -> QualityMetrics {
    assess(
        dataset,
        normalized.source,
        &normalized.rows,
        &normalized.rejections,
        normalized.rows_read,
        vocabulary,
        today,
    )
}

/// `(total - rejected) / total`; 1.0 for an empty batch.
pub fn completeness_ratio(total_raw_count: usize, rejected_count: usize) -> f64 {
    ratio(total_raw_count.saturating_sub(rejected_count), total_raw_count)
}

/// Days from the newest row to `today`, floored at zero; `None` without rows.
pub fn freshness_days<T: Observation>(rows: &[T], today: NaiveDate) -> Option<i64> {
    let newest = rows.iter().map(Observation::date).max()?;
    Some((today - newest).num_days().max(0))
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 1.0;
    }
    (part as f64 / whole as f64).clamp(0.0, 1.0)
}
