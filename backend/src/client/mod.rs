//! Viewport-driven map client.
//!
//! ```text
//! viewport change
//!       │
//!       ▼
//! SweepController ──► PageFetcher (HTTP or in-process repository)
//!       │  pages tagged with a generation; stale ones are dropped
//!       ▼
//! DedupAccumulator ──► ViewportFilter ──► grid clustering ──► RenderState
//! ```
//!
//! [`MapView`] wires the stages together and keeps the last good render
//! state when a sweep fails.

pub mod cluster;
pub mod config;
pub mod dedup;
pub mod error;
pub mod fetcher;
pub mod sweep;
pub mod view;
pub mod viewport;

pub use cluster::{cluster, Cluster, Clustering, Glyph, GridConfig, Marker};
pub use config::MapConfig;
pub use dedup::{DedupAccumulator, DedupKey};
pub use error::{ConfigError, FetchError, SweepError};
#[cfg(feature = "http-client")]
pub use fetcher::HttpPageFetcher;
pub use fetcher::{PageFetcher, RepositoryPageFetcher};
pub use sweep::{SweepConfig, SweepController, SweepOutcome, SweepSnapshot};
pub use view::{MapView, RenderState, RenderStatus, ViewUpdate};
pub use viewport::ViewportFilter;
