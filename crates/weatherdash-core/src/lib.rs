// weatherdash-core: Sync layer between weatherdash-api and consumers (CLI).

pub mod auth;
pub mod cache;
pub mod config;
pub mod convert;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod state;
pub mod station;
pub mod stream;
pub mod token_store;
pub mod transport;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{SyncConfig, SyncPolicy};
pub use coordinator::{SyncCoordinator, SyncHandle};
pub use error::{AuthError, CoreError, FetchError};
pub use state::SyncState;
pub use stream::StateStream;
pub use token_store::{MemoryTokenStore, PersistError, RefreshTokenStore};
pub use transport::VendorTransport;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AuthStatus, CacheStatus, MeasurementCacheEntry, MeasurementKey, MetricType, ModuleKind,
    ModuleRecord, Readings, Sample, StationSnapshot, TimeSeries, Timelapse, TokenPair, UserPrefs,
};
