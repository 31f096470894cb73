//! Input/output helpers.
//!
//! - raw row normalization + validation (`ingest`)
//! - report exports (CSV/JSON) (`export`)

pub mod export;
pub mod ingest;
