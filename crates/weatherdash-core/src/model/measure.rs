// ── Measurement domain types ──

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use tokio::time::Instant;

use crate::error::FetchError;

/// Telemetry type, named the way the vendor names it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum MetricType {
    Temperature,
    Humidity,
    #[serde(rename = "CO2")]
    #[strum(serialize = "CO2")]
    Co2,
    Pressure,
    Noise,
    Rain,
    WindStrength,
    WindAngle,
    GustStrength,
    GustAngle,
}

impl MetricType {
    /// Name used in the vendor `type` query parameter.
    pub fn vendor_name(self) -> &'static str {
        self.into()
    }
}

/// Selectable time range of a measurement query.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
pub enum Timelapse {
    #[serde(rename = "12h")]
    #[strum(serialize = "12h")]
    TwelveHours,
    #[serde(rename = "1d")]
    #[strum(serialize = "1d")]
    OneDay,
    #[serde(rename = "1m")]
    #[strum(serialize = "1m")]
    OneMonth,
}

impl Timelapse {
    /// Vendor aggregation scale for this range.
    pub fn scale(self) -> &'static str {
        match self {
            Self::TwelveHours => "30min",
            Self::OneDay => "1hour",
            Self::OneMonth => "1day",
        }
    }

    /// How far back from now the query reaches.
    pub fn window(self) -> Duration {
        const HOUR: u64 = 60 * 60;
        match self {
            Self::TwelveHours => Duration::from_secs(12 * HOUR),
            Self::OneDay => Duration::from_secs(24 * HOUR),
            Self::OneMonth => Duration::from_secs(30 * 24 * HOUR),
        }
    }
}

/// Cache key for one measurement query.
///
/// The metric set is kept sorted and deduplicated, so two requests that
/// differ only in metric order or repetition map to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MeasurementKey {
    device_id: String,
    module_id: String,
    metrics: Vec<MetricType>,
    timelapse: Timelapse,
}

impl MeasurementKey {
    pub fn new(
        device_id: impl Into<String>,
        module_id: impl Into<String>,
        metrics: impl IntoIterator<Item = MetricType>,
        timelapse: Timelapse,
    ) -> Self {
        let mut metrics: Vec<MetricType> = metrics.into_iter().collect();
        metrics.sort_unstable();
        metrics.dedup();
        Self {
            device_id: device_id.into(),
            module_id: module_id.into(),
            metrics,
            timelapse,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    pub fn metrics(&self) -> &[MetricType] {
        &self.metrics
    }

    pub fn timelapse(&self) -> Timelapse {
        self.timelapse
    }
}

impl fmt::Display for MeasurementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/", self.device_id, self.module_id)?;
        for (i, metric) in self.metrics.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{metric}")?;
        }
        write!(f, "@{}", self.timelapse)
    }
}

/// One row of a time series: a timestamp and one value per metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub at: DateTime<Utc>,
    pub values: Vec<Option<f64>>,
}

/// Measurements for a key, in ascending time order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    /// Column order of `Sample::values`.
    pub metrics: Vec<MetricType>,
    pub samples: Vec<Sample>,
}

impl TimeSeries {
    pub fn empty(metrics: &[MetricType]) -> Self {
        Self {
            metrics: metrics.to_vec(),
            samples: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Values of a single metric column, paired with their timestamps.
    pub fn column(&self, metric: MetricType) -> impl Iterator<Item = (DateTime<Utc>, Option<f64>)> {
        let index = self.metrics.iter().position(|m| *m == metric);
        self.samples.iter().filter_map(move |sample| {
            let idx = index?;
            Some((sample.at, sample.values.get(idx).copied().flatten()))
        })
    }
}

/// Lifecycle status of a cache entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CacheStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(FetchError),
}

impl CacheStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Consumer-visible state of one measurement key.
///
/// `data` survives a later `Loading` or `Failed` transition so the last
/// good series stays renderable.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementCacheEntry {
    pub key: MeasurementKey,
    pub data: Option<Arc<TimeSeries>>,
    pub status: CacheStatus,
    pub fetched_at: Option<Instant>,
    pub(crate) request_id: Option<u64>,
    pub(crate) invalidated: bool,
}

impl MeasurementCacheEntry {
    /// A fresh `Idle` entry with no data.
    pub fn idle(key: MeasurementKey) -> Self {
        Self {
            key,
            data: None,
            status: CacheStatus::Idle,
            fetched_at: None,
            request_id: None,
            invalidated: false,
        }
    }

    /// Age of the stored data, if any was ever fetched.
    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.fetched_at.map(|at| now.saturating_duration_since(at))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn key_normalizes_metric_order_and_duplicates() {
        let a = MeasurementKey::new(
            "d1",
            "m1",
            [MetricType::Rain, MetricType::Temperature, MetricType::Rain],
            Timelapse::OneDay,
        );
        let b = MeasurementKey::new(
            "d1",
            "m1",
            [MetricType::Temperature, MetricType::Rain],
            Timelapse::OneDay,
        );
        assert_eq!(a, b);
        assert_eq!(a.metrics(), &[MetricType::Temperature, MetricType::Rain]);
    }

    #[test]
    fn key_distinguishes_timelapse() {
        let a = MeasurementKey::new("d1", "m1", [MetricType::Rain], Timelapse::OneDay);
        let b = MeasurementKey::new("d1", "m1", [MetricType::Rain], Timelapse::OneMonth);
        assert_ne!(a, b);
    }

    #[test]
    fn key_display() {
        let key = MeasurementKey::new(
            "d1",
            "m1",
            [MetricType::Co2, MetricType::Temperature],
            Timelapse::TwelveHours,
        );
        assert_eq!(key.to_string(), "d1/m1/Temperature,CO2@12h");
    }

    #[test]
    fn metric_names_match_vendor() {
        assert_eq!(MetricType::Co2.vendor_name(), "CO2");
        assert_eq!(MetricType::WindStrength.vendor_name(), "WindStrength");
        assert_eq!("co2".parse::<MetricType>().unwrap(), MetricType::Co2);
        assert_eq!("rain".parse::<MetricType>().unwrap(), MetricType::Rain);
    }

    #[test]
    fn timelapse_scales() {
        assert_eq!("1d".parse::<Timelapse>().unwrap(), Timelapse::OneDay);
        assert_eq!(Timelapse::TwelveHours.scale(), "30min");
        assert_eq!(Timelapse::OneMonth.window(), Duration::from_secs(30 * 86_400));
    }

    #[test]
    fn column_extracts_one_metric() {
        let at = DateTime::from_timestamp(1_600_000_000, 0).unwrap();
        let series = TimeSeries {
            metrics: vec![MetricType::Temperature, MetricType::Humidity],
            samples: vec![Sample {
                at,
                values: vec![Some(20.5), None],
            }],
        };
        let temps: Vec<_> = series.column(MetricType::Temperature).collect();
        assert_eq!(temps, vec![(at, Some(20.5))]);
        let hum: Vec<_> = series.column(MetricType::Humidity).collect();
        assert_eq!(hum, vec![(at, None)]);
        assert_eq!(series.column(MetricType::Rain).count(), 0);
    }
}
