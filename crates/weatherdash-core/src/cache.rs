// ── Measurement cache ──
//
// Per-key time series with request deduplication and staleness. Every
// dispatch is tagged with a request id and the cache epoch; a completion
// is applied only to the entry that is still waiting for that exact
// request, so responses may arrive in any order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::error::FetchError;
use crate::model::{CacheStatus, MeasurementCacheEntry, MeasurementKey, TimeSeries};

/// A measurement request admitted by the cache, to be sent to the vendor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureDispatch {
    pub key: MeasurementKey,
    pub request_id: u64,
    pub epoch: u64,
}

pub struct MeasurementCache {
    entries: HashMap<MeasurementKey, MeasurementCacheEntry>,
    freshness: Duration,
    epoch: u64,
    next_request: u64,
}

impl MeasurementCache {
    pub fn new(freshness: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            freshness,
            epoch: 0,
            next_request: 0,
        }
    }

    /// Identity epoch. Bumped by every [`clear`](Self::clear).
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Decide whether `key` needs a vendor call.
    ///
    /// `None` when a fetch is already in flight or the entry is `Ready`,
    /// fresh and not invalidated. Otherwise the entry moves to `Loading`
    /// (keeping any previous data) and the dispatch to send is returned.
    pub fn begin_fetch(&mut self, key: MeasurementKey, now: Instant) -> Option<MeasureDispatch> {
        if let Some(entry) = self.entries.get(&key) {
            match entry.status {
                CacheStatus::Loading => {
                    debug!(%key, "measurement already loading");
                    return None;
                }
                CacheStatus::Ready
                    if !entry.invalidated
                        && entry.age(now).is_some_and(|age| age < self.freshness) =>
                {
                    debug!(%key, "measurement fresh, skipping fetch");
                    return None;
                }
                _ => {}
            }
        }

        self.next_request += 1;
        let request_id = self.next_request;
        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| MeasurementCacheEntry::idle(key.clone()));
        entry.status = CacheStatus::Loading;
        entry.request_id = Some(request_id);
        entry.invalidated = false;

        Some(MeasureDispatch {
            key,
            request_id,
            epoch: self.epoch,
        })
    }

    /// Apply the outcome of `dispatch`. Returns `false` when the
    /// completion was stale and discarded.
    pub fn complete(
        &mut self,
        dispatch: &MeasureDispatch,
        result: Result<TimeSeries, FetchError>,
        now: Instant,
    ) -> bool {
        if dispatch.epoch != self.epoch {
            debug!(
                key = %dispatch.key,
                epoch = dispatch.epoch,
                "discarding measurement from previous session"
            );
            return false;
        }
        let Some(entry) = self.entries.get_mut(&dispatch.key) else {
            debug!(key = %dispatch.key, "discarding measurement for untracked key");
            return false;
        };
        if !entry.status.is_loading() || entry.request_id != Some(dispatch.request_id) {
            debug!(
                key = %dispatch.key,
                request_id = dispatch.request_id,
                "discarding superseded measurement"
            );
            return false;
        }

        match result {
            Ok(series) => {
                entry.data = Some(Arc::new(series));
                entry.status = CacheStatus::Ready;
                entry.fetched_at = Some(now);
            }
            Err(FetchError::NoDataForRange) => {
                entry.data = Some(Arc::new(TimeSeries::empty(dispatch.key.metrics())));
                entry.status = CacheStatus::Ready;
                entry.fetched_at = Some(now);
            }
            Err(e) => {
                debug!(key = %dispatch.key, error = %e, "measurement fetch failed");
                entry.status = CacheStatus::Failed(e);
            }
        }
        entry.request_id = None;
        true
    }

    /// Mark `key` as failed without a vendor call.
    pub fn record_failure(&mut self, key: MeasurementKey, error: FetchError) {
        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| MeasurementCacheEntry::idle(key));
        entry.status = CacheStatus::Failed(error);
        entry.request_id = None;
    }

    /// Make the next fetch of `key` bypass the freshness check.
    pub fn invalidate(&mut self, key: &MeasurementKey) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.invalidated = true;
        }
    }

    /// Current entry for `key`; an `Idle` placeholder if untracked.
    pub fn read(&self, key: &MeasurementKey) -> MeasurementCacheEntry {
        self.entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| MeasurementCacheEntry::idle(key.clone()))
    }

    /// Drop every entry and start a new epoch.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.epoch += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> HashMap<MeasurementKey, MeasurementCacheEntry> {
        self.entries.clone()
    }
}
