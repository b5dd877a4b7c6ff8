// ── Domain model ──
//
// Canonical types the sync core hands to consumers. Wire structs from
// weatherdash-api never leak past `convert.rs`; everything here is
// vendor-neutral and immutable once published.

pub mod measure;
pub mod station;
pub mod token;

pub use measure::{
    CacheStatus, MeasurementCacheEntry, MeasurementKey, MetricType, Sample, Timelapse, TimeSeries,
};
pub use station::{
    ModuleKind, ModuleRecord, PressureUnit, Readings, StationSnapshot, UnitSystem, UserPrefs,
    WindUnit,
};
pub use token::{AuthStatus, TokenPair};
