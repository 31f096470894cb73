//! Per-session state: the current snapshot and a normalized-row cache.
//!
//! The cache is keyed by (dataset, source tag). Refreshing re-checks the
//! connection; when a dataset's live/synthetic decision flips, its cached
//! rows are dropped, and when the raw rows differ from the cached batch they
//! are normalized again.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use tracing::{debug, info};

use crate::app::pipeline::{PipelineConfig, PipelineReport, Snapshot, build_report};
use crate::data::{ConnectionStatus, SourceAdapter};
use crate::domain::{
    DatasetKind, FilterCriteria, InflationRecord, ProductPriceRecord, RawInflationRow, RawPriceRow,
    SourceTag,
};
use crate::io::ingest::{Normalized, normalize_inflation, normalize_products};

/// A normalized batch and the fingerprint of the raw rows it came from.
#[derive(Debug)]
struct Entry<T> {
    fingerprint: u64,
    rows: Rc<Normalized<T>>,
}

/// Normalized rows per (dataset, source tag).
///
/// An entry is reused only while the raw batch hashes the same; new or
/// changed warehouse rows are normalized again.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    inflation: HashMap<SourceTag, Entry<InflationRecord>>,
    products: HashMap<SourceTag, Entry<ProductPriceRecord>>,
}

impl SnapshotCache {
    pub fn inflation(&mut self, tag: SourceTag, raw: &[RawInflationRow]) -> Rc<Normalized<InflationRecord>> {
        read_through(&mut self.inflation, DatasetKind::Inflation, tag, raw, normalize_inflation)
    }

    pub fn products(&mut self, tag: SourceTag, raw: &[RawPriceRow]) -> Rc<Normalized<ProductPriceRecord>> {
        read_through(&mut self.products, DatasetKind::Product, tag, raw, normalize_products)
    }

    pub fn contains(&self, kind: DatasetKind, tag: SourceTag) -> bool {
        match kind {
            DatasetKind::Inflation => self.inflation.contains_key(&tag),
            DatasetKind::Product => self.products.contains_key(&tag),
        }
    }

    pub fn invalidate(&mut self, kind: DatasetKind) {
        match kind {
            DatasetKind::Inflation => self.inflation.clear(),
            DatasetKind::Product => self.products.clear(),
        }
    }

    pub fn clear(&mut self) {
        self.inflation.clear();
        self.products.clear();
    }

    pub fn len(&self) -> usize {
        self.inflation.len() + self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn read_through<R: Hash, T>(
    entries: &mut HashMap<SourceTag, Entry<T>>,
    kind: DatasetKind,
    tag: SourceTag,
    raw: &[R],
    normalize: fn(&[R], SourceTag) -> Normalized<T>,
) -> Rc<Normalized<T>> {
    let fingerprint = fingerprint(raw);
    match entries.get(&tag) {
        Some(entry) if entry.fingerprint == fingerprint => {
            debug!(dataset = %kind, source = %tag, "Reusing cached rows");
            return Rc::clone(&entry.rows);
        }
        Some(_) => info!(dataset = %kind, source = %tag, rows = raw.len(), "Raw rows changed; normalizing again"),
        None => {}
    }

    let rows = Rc::new(normalize(raw, tag));
    entries.insert(
        tag,
        Entry {
            fingerprint,
            rows: Rc::clone(&rows),
        },
    );
    rows
}

fn fingerprint<R: Hash>(raw: &[R]) -> u64 {
    let mut hasher = DefaultHasher::new();
    raw.hash(&mut hasher);
    hasher.finish()
}

pub struct Session {
    config: PipelineConfig,
    cache: SnapshotCache,
    current: Option<Snapshot>,
    last: Option<PipelineReport>,
}

impl Session {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            cache: SnapshotCache::default(),
            current: None,
            last: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// Status of the current snapshot; `None` before the first fetch.
    pub fn status(&self) -> Option<&ConnectionStatus> {
        self.current.as_ref().map(|s| &s.status)
    }

    /// The most recent report; `None` until a query has been answered.
    pub fn last_report(&self) -> Option<&PipelineReport> {
        self.last.as_ref()
    }

    /// Fetch both datasets again and rebuild the snapshot.
    ///
    /// Normalized rows are reused from the cache while a dataset's source tag
    /// and raw rows are unchanged; `clear_cache` forces re-normalization.
    pub fn refresh(&mut self, adapter: &SourceAdapter) -> &Snapshot {
        let inflation = adapter.fetch_inflation();
        let products = adapter.fetch_products();
        let status = ConnectionStatus {
            inflation: inflation.status.clone(),
            product: products.status.clone(),
        };

        if let Some(previous) = &self.current {
            for kind in DatasetKind::ALL {
                let (before, after) = (previous.status.source_tag(kind), status.source_tag(kind));
                if before != after {
                    info!(dataset = %kind, %before, %after, "Source changed; dropping cached rows");
                    self.cache.invalidate(kind);
                }
            }
        }

        let inflation_rows = self.cache.inflation(inflation.source, &inflation.rows);
        let product_rows = self.cache.products(products.source, &products.rows);

        self.current.insert(Snapshot {
            status,
            inflation: inflation_rows,
            products: product_rows,
        })
    }

    /// Answer a filter request from the current snapshot, fetching first if
    /// nothing has been loaded yet.
    pub fn query(&mut self, adapter: &SourceAdapter, criteria: &FilterCriteria) -> &PipelineReport {
        let snapshot = match self.current.clone() {
            Some(snapshot) => snapshot,
            None => self.refresh(adapter).clone(),
        };
        let report = build_report(&snapshot, criteria, &self.config);
        self.last.insert(report)
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::data::LiveSource;
    use crate::error::SourceError;

    /// Live for the first `live_calls` product fetches, then failing.
    struct Flaky {
        live_calls: usize,
        calls: Cell<usize>,
    }

    impl LiveSource for Flaky {
        fn fetch_inflation(&self) -> Result<Vec<RawInflationRow>, SourceError> {
            Err(SourceError::Connectivity("offline".into()))
        }

        fn fetch_products(&self) -> Result<Vec<RawPriceRow>, SourceError> {
            let n = self.calls.get();
            self.calls.set(n + 1);
            if n >= self.live_calls {
                return Err(SourceError::Connectivity("connection reset".into()));
            }
            Ok(vec![RawPriceRow {
                product_id: Some("P1".into()),
                brand: Some("Arla".into()),
                category: Some("Dairy products".into()),
                country: Some("DE".into()),
                observed_date: Some("2023-01-01".into()),
                price: Some("1.50".into()),
                currency: Some("EUR".into()),
            }])
        }
    }

    #[test]
    fn no_report_before_first_query() {
        let session = Session::new(PipelineConfig::default());
        assert!(session.last_report().is_none());
        assert!(session.status().is_none());
    }

    #[test]
    fn query_loads_once_and_reuses_snapshot() {
        let adapter = SourceAdapter::new(
            Box::new(Flaky {
                live_calls: 10,
                calls: Cell::new(0),
            }),
            42,
        );
        let mut session = Session::new(PipelineConfig::default());
        session.query(&adapter, &FilterCriteria::default());
        session.query(&adapter, &FilterCriteria::default().with_countries(["FR"]));

        let status = session.status().unwrap();
        assert!(status.is_live(DatasetKind::Product));
        assert!(!status.is_live(DatasetKind::Inflation));
        assert_eq!(session.cache().len(), 2);
        assert!(session.last_report().unwrap().series.is_empty());
    }

    #[test]
    fn status_flip_invalidates_cached_rows() {
        let adapter = SourceAdapter::new(
            Box::new(Flaky {
                live_calls: 1,
                calls: Cell::new(0),
            }),
            42,
        );
        let mut session = Session::new(PipelineConfig::default());

        let first = session.refresh(&adapter).products.rows_used();
        assert_eq!(first, 1);
        assert!(session.cache().contains(DatasetKind::Product, SourceTag::Live));

        let second = session.refresh(&adapter);
        assert_eq!(second.products.source, SourceTag::Synthetic);
        assert!(second.products.rows_used() > 1);
        assert!(!session.cache().contains(DatasetKind::Product, SourceTag::Live));
        assert!(session.cache().contains(DatasetKind::Product, SourceTag::Synthetic));
    }

    #[test]
    fn unchanged_source_reuses_normalized_rows() {
        let adapter = SourceAdapter::offline(42);
        let mut session = Session::new(PipelineConfig::default());
        let first = Rc::clone(&session.refresh(&adapter).inflation);
        let second = Rc::clone(&session.refresh(&adapter).inflation);
        assert!(Rc::ptr_eq(&first, &second));

        session.clear_cache();
        let third = Rc::clone(&session.refresh(&adapter).inflation);
        assert!(!Rc::ptr_eq(&first, &third));
        assert_eq!(first.rows, third.rows);
    }

    /// Live warehouse that gains one inflation row per call.
    struct Growing {
        calls: Cell<u32>,
    }

    impl LiveSource for Growing {
        fn fetch_inflation(&self) -> Result<Vec<RawInflationRow>, SourceError> {
            let n = self.calls.get() + 1;
            self.calls.set(n);
            Ok((1..=n)
                .map(|month| RawInflationRow {
                    country: Some("DE".into()),
                    category: Some("Meat".into()),
                    period: Some(format!("2023-{month:02}")),
                    rate: Some("5.0".into()),
                })
                .collect())
        }

        fn fetch_products(&self) -> Result<Vec<RawPriceRow>, SourceError> {
            Err(SourceError::Connectivity("offline".into()))
        }
    }

    #[test]
    fn changed_live_rows_are_normalized_again() {
        let adapter = SourceAdapter::new(Box::new(Growing { calls: Cell::new(0) }), 42);
        let mut session = Session::new(PipelineConfig::default());

        let first = Rc::clone(&session.refresh(&adapter).inflation);
        assert_eq!(first.rows_used(), 1);

        let second = Rc::clone(&session.refresh(&adapter).inflation);
        assert_eq!(second.source, SourceTag::Live);
        assert_eq!(second.rows_used(), 2);
        assert!(!Rc::ptr_eq(&first, &second));

        // Synthetic products are identical on every call and stay cached.
        assert_eq!(session.cache().len(), 2);
    }

    #[test]
    fn query_after_refresh_sees_new_rows() {
        let adapter = SourceAdapter::new(Box::new(Growing { calls: Cell::new(0) }), 42);
        let mut session = Session::new(PipelineConfig::default());
        let criteria = FilterCriteria::default().with_countries(["DE"]).with_categories(["meat"]);

        let before = session.query(&adapter, &criteria).inflation_rows;
        session.refresh(&adapter);
        let after = session.query(&adapter, &criteria).inflation_rows;
        assert_eq!((before, after), (1, 2));
    }
}
