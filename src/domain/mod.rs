//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - provenance and dataset tags (`SourceTag`, `DatasetKind`)
//! - raw and normalized rows for both datasets
//! - filter criteria, quality metrics, and comparison series
//! - the reference vocabulary used for consistency scoring

pub mod types;
pub mod vocabulary;

pub use types::*;
pub use vocabulary::{ReferenceVocabulary, normalize_country, normalize_label};
