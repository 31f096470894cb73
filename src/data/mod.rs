//! Data acquisition: the warehouse client, the synthetic generator, and the
//! adapter that chooses between them.

pub mod sample;
pub mod source;
pub mod warehouse;

pub use sample::{DEFAULT_SEED, synthetic_inflation, synthetic_products};
pub use source::{ConnectionStatus, FetchOutcome, FetchStatus, LiveSource, SourceAdapter};
pub use warehouse::{WarehouseClient, WarehouseConfig};
