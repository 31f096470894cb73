//! Live-or-synthetic source selection.
//!
//! `SourceAdapter` tries the live backend once per dataset and, on any
//! failure (including an empty result), substitutes seeded synthetic rows.
//! The decision is returned as a `FetchOutcome`, never as an error.

use std::time::Duration;

use tracing::{info, warn};

use crate::data::sample::{synthetic_inflation, synthetic_products};
use crate::data::warehouse::{WarehouseClient, WarehouseConfig};
use crate::domain::{DatasetKind, RawInflationRow, RawPriceRow, SourceTag};
use crate::error::SourceError;

/// A backend able to return raw rows for both datasets.
pub trait LiveSource {
    fn fetch_inflation(&self) -> Result<Vec<RawInflationRow>, SourceError>;
    fn fetch_products(&self) -> Result<Vec<RawPriceRow>, SourceError>;
}

/// Why a dataset ended up live or synthetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Live,
    /// No warehouse configuration was supplied.
    Unconfigured,
    /// The live fetch failed and synthetic rows were substituted.
    Degraded(SourceError),
}

impl FetchStatus {
    pub fn source_tag(&self) -> SourceTag {
        match self {
            FetchStatus::Live => SourceTag::Live,
            FetchStatus::Unconfigured | FetchStatus::Degraded(_) => SourceTag::Synthetic,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, FetchStatus::Live)
    }

    /// One-line description for status banners.
    pub fn describe(&self) -> String {
        match self {
            FetchStatus::Live => "live warehouse data".to_string(),
            FetchStatus::Unconfigured => "synthetic data (no warehouse configured)".to_string(),
            FetchStatus::Degraded(err) => format!("synthetic data ({err})"),
        }
    }
}

/// Rows for one dataset plus the provenance decision.
#[derive(Debug, Clone)]
pub struct FetchOutcome<R> {
    pub rows: Vec<R>,
    pub source: SourceTag,
    pub status: FetchStatus,
}

impl<R> FetchOutcome<R> {
    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }
}

/// Per-dataset fetch status for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub inflation: FetchStatus,
    pub product: FetchStatus,
}

impl ConnectionStatus {
    pub fn status(&self, kind: DatasetKind) -> &FetchStatus {
        match kind {
            DatasetKind::Inflation => &self.inflation,
            DatasetKind::Product => &self.product,
        }
    }

    pub fn source_tag(&self, kind: DatasetKind) -> SourceTag {
        self.status(kind).source_tag()
    }

    pub fn is_live(&self, kind: DatasetKind) -> bool {
        self.status(kind).is_live()
    }
}

enum Backend {
    Unconfigured,
    /// Configured, but the client could not even be built.
    Unavailable(SourceError),
    Live(Box<dyn LiveSource>),
}

pub struct SourceAdapter {
    backend: Backend,
    seed: u64,
}

impl SourceAdapter {
    pub fn new(live: Box<dyn LiveSource>, seed: u64) -> Self {
        Self {
            backend: Backend::Live(live),
            seed,
        }
    }

    /// An adapter that never attempts a live fetch.
    pub fn offline(seed: u64) -> Self {
        Self {
            backend: Backend::Unconfigured,
            seed,
        }
    }

    /// Build from an optional warehouse configuration; `None` means offline.
    pub fn from_config(config: Option<WarehouseConfig>, timeout: Duration, seed: u64) -> Self {
        let backend = match config {
            None => Backend::Unconfigured,
            Some(config) => match WarehouseClient::new(config, timeout) {
                Ok(client) => Backend::Live(Box::new(client)),
                Err(err) => Backend::Unavailable(err),
            },
        };
        Self { backend, seed }
    }

    pub fn fetch_inflation(&self) -> FetchOutcome<RawInflationRow> {
        self.fetch(
            DatasetKind::Inflation,
            |live| live.fetch_inflation(),
            synthetic_inflation,
        )
    }

    pub fn fetch_products(&self) -> FetchOutcome<RawPriceRow> {
        self.fetch(DatasetKind::Product, |live| live.fetch_products(), synthetic_products)
    }

    fn fetch<R>(
        &self,
        kind: DatasetKind,
        live_fetch: impl FnOnce(&dyn LiveSource) -> Result<Vec<R>, SourceError>,
        synthesize: fn(u64) -> Vec<R>,
    ) -> FetchOutcome<R> {
        let status = match &self.backend {
            Backend::Unconfigured => FetchStatus::Unconfigured,
            Backend::Unavailable(err) => FetchStatus::Degraded(err.clone()),
            Backend::Live(live) => match live_fetch(live.as_ref()) {
                Ok(rows) if !rows.is_empty() => {
                    info!(dataset = %kind, rows = rows.len(), "Fetched live rows");
                    return FetchOutcome {
                        rows,
                        source: SourceTag::Live,
                        status: FetchStatus::Live,
                    };
                }
                Ok(_) => FetchStatus::Degraded(SourceError::EmptyResultSet(kind)),
                Err(err) => FetchStatus::Degraded(err),
            },
        };

        match &status {
            FetchStatus::Degraded(err) => {
                warn!(dataset = %kind, error = %err, "Live fetch failed; falling back to synthetic data");
            }
            _ => info!(dataset = %kind, seed = self.seed, "No warehouse configured; using synthetic data"),
        }

        FetchOutcome {
            rows: synthesize(self.seed),
            source: SourceTag::Synthetic,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing(SourceError);

    impl LiveSource for Failing {
        fn fetch_inflation(&self) -> Result<Vec<RawInflationRow>, SourceError> {
            Err(self.0.clone())
        }

        fn fetch_products(&self) -> Result<Vec<RawPriceRow>, SourceError> {
            Err(self.0.clone())
        }
    }

    struct Empty;

    impl LiveSource for Empty {
        fn fetch_inflation(&self) -> Result<Vec<RawInflationRow>, SourceError> {
            Ok(Vec::new())
        }

        fn fetch_products(&self) -> Result<Vec<RawPriceRow>, SourceError> {
            Ok(Vec::new())
        }
    }

    struct OneRow;

    impl LiveSource for OneRow {
        fn fetch_inflation(&self) -> Result<Vec<RawInflationRow>, SourceError> {
            Ok(vec![RawInflationRow {
                country: Some("DE".into()),
                category: Some("Meat".into()),
                period: Some("2023-01".into()),
                rate: Some("6.1".into()),
            }])
        }

        fn fetch_products(&self) -> Result<Vec<RawPriceRow>, SourceError> {
            Err(SourceError::Authentication("status 401".into()))
        }
    }

    #[test]
    fn unconfigured_adapter_is_synthetic() {
        let adapter = SourceAdapter::offline(42);
        let out = adapter.fetch_inflation();
        assert_eq!(out.source, SourceTag::Synthetic);
        assert_eq!(out.status, FetchStatus::Unconfigured);
        assert!(!out.is_live());
        assert!(!out.rows.is_empty());
    }

    #[test]
    fn connectivity_failure_is_absorbed() {
        let err = SourceError::Connectivity("dns error".into());
        let adapter = SourceAdapter::new(Box::new(Failing(err.clone())), 42);
        let out = adapter.fetch_products();
        assert_eq!(out.source, SourceTag::Synthetic);
        assert_eq!(out.status, FetchStatus::Degraded(err));
        assert_eq!(out.rows, synthetic_products(42));
    }

    #[test]
    fn empty_live_result_falls_back() {
        let adapter = SourceAdapter::new(Box::new(Empty), 42);
        let out = adapter.fetch_inflation();
        assert_eq!(
            out.status,
            FetchStatus::Degraded(SourceError::EmptyResultSet(DatasetKind::Inflation))
        );
        assert_eq!(out.source, SourceTag::Synthetic);
    }

    #[test]
    fn each_dataset_decides_independently() {
        let adapter = SourceAdapter::new(Box::new(OneRow), 42);
        let inflation = adapter.fetch_inflation();
        let products = adapter.fetch_products();
        assert!(inflation.is_live());
        assert_eq!(inflation.rows.len(), 1);
        assert_eq!(products.source, SourceTag::Synthetic);
        assert!(products.status.describe().contains("credentials"));
    }

    #[test]
    fn connection_status_reports_per_dataset() {
        let status = ConnectionStatus {
            inflation: FetchStatus::Live,
            product: FetchStatus::Unconfigured,
        };
        assert!(status.is_live(DatasetKind::Inflation));
        assert_eq!(status.source_tag(DatasetKind::Product), SourceTag::Synthetic);
    }
}
