// ── Station data sync ──
//
// Holds the last known-good station snapshot and the loading/error
// flags around it. A failed fetch never touches the snapshot.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::FetchError;
use crate::model::StationSnapshot;

#[derive(Default)]
pub struct StationDataSync {
    snapshot: Option<Arc<StationSnapshot>>,
    loading: bool,
    last_error: Option<FetchError>,
}

impl StationDataSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<&Arc<StationSnapshot>> {
        self.snapshot.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    /// Mark a fetch as started. Returns `false` if one is already running,
    /// in which case the caller joins it.
    pub fn begin(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.loading = true;
        true
    }

    /// Apply a fetch outcome.
    pub fn finish(
        &mut self,
        result: Result<StationSnapshot, FetchError>,
    ) -> Result<Arc<StationSnapshot>, FetchError> {
        self.loading = false;
        match result {
            Ok(snapshot) => {
                debug!(
                    device = %snapshot.device_id,
                    modules = snapshot.modules.len(),
                    "station snapshot replaced"
                );
                let snapshot = Arc::new(snapshot);
                self.snapshot = Some(Arc::clone(&snapshot));
                self.last_error = None;
                Ok(snapshot)
            }
            Err(e) => {
                warn!(error = %e, "station data fetch failed");
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Record an error without a fetch having run.
    pub fn record_error(&mut self, error: FetchError) {
        self.last_error = Some(error);
    }

    /// Forget the snapshot. `cause` becomes the visible error.
    pub fn clear(&mut self, cause: Option<FetchError>) {
        self.snapshot = None;
        self.loading = false;
        self.last_error = cause;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn failure_keeps_previous_snapshot() {
        let mut sync = StationDataSync::new();
        assert!(sync.begin());
        sync.finish(Ok(StationSnapshot::new("s1", Utc::now()))).unwrap();

        assert!(sync.begin());
        assert!(sync.is_loading());
        let err = sync.finish(Err(FetchError::NetworkUnavailable)).unwrap_err();

        assert_eq!(err, FetchError::NetworkUnavailable);
        assert!(!sync.is_loading());
        assert_eq!(sync.snapshot().unwrap().device_id, "s1");
        assert_eq!(sync.last_error(), Some(&FetchError::NetworkUnavailable));
    }

    #[test]
    fn success_clears_error() {
        let mut sync = StationDataSync::new();
        sync.record_error(FetchError::NetworkUnavailable);
        sync.begin();
        sync.finish(Ok(StationSnapshot::new("s2", Utc::now()))).unwrap();
        assert!(sync.last_error().is_none());
    }

    #[test]
    fn second_begin_joins() {
        let mut sync = StationDataSync::new();
        assert!(sync.begin());
        assert!(!sync.begin());
    }

    #[test]
    fn clear_drops_snapshot() {
        let mut sync = StationDataSync::new();
        sync.begin();
        sync.finish(Ok(StationSnapshot::new("s1", Utc::now()))).unwrap();
        sync.clear(Some(FetchError::TokenRevoked));
        assert!(sync.snapshot().is_none());
        assert_eq!(sync.last_error(), Some(&FetchError::TokenRevoked));
    }
}
