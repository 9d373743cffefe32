pub mod api;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod fetch;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod normalize;

pub use cache::SnapshotCache;
pub use dashboard::DashboardSummary;
pub use error::{Error, FetchError, NormalizeError, StoreError};
pub use export::SnapshotStore;
pub use fetch::{ListingsClient, RawBatch};
pub use ingest::run_ingestion;
pub use metrics::{aggregate, compare, format_magnitude, rankings, LatestView, Metric};
pub use model::AssetQuote;
pub use normalize::{normalize, NormalizedBatch};
