// ── Consumer read model ──

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AuthError, FetchError};
use crate::model::{AuthStatus, MeasurementCacheEntry, MeasurementKey, StationSnapshot};

/// Merged, immutable view of everything the sync core knows.
///
/// Published through a `watch` channel on every transition. Consumers
/// only ever see whole snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncState {
    pub auth: AuthStatus,
    /// Outcome of the last failed login or refresh, for inline display.
    pub last_auth_error: Option<AuthError>,
    /// Last known-good station snapshot.
    pub station: Option<Arc<StationSnapshot>>,
    pub loading_station_data: bool,
    pub station_data_errors: Option<FetchError>,
    pub measurements: Arc<HashMap<MeasurementKey, MeasurementCacheEntry>>,
}

impl SyncState {
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    /// Entry for `key`; an `Idle` placeholder if untracked.
    pub fn measurement(&self, key: &MeasurementKey) -> MeasurementCacheEntry {
        self.measurements
            .get(key)
            .cloned()
            .unwrap_or_else(|| MeasurementCacheEntry::idle(key.clone()))
    }
}
