// ── Station domain types ──

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Kind of module in a weather station.
///
/// A station has at most one module of each kind in its snapshot; the
/// base station itself is `Main`.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ModuleKind {
    Main,
    Outdoor,
    Wind,
    Rain,
    Indoor,
}

impl ModuleKind {
    /// Map a vendor device type (`NAMain`, `NAModule1`, ...) to a kind.
    pub fn from_vendor_type(kind: &str) -> Option<Self> {
        match kind {
            "NAMain" => Some(Self::Main),
            "NAModule1" => Some(Self::Outdoor),
            "NAModule2" => Some(Self::Wind),
            "NAModule3" => Some(Self::Rain),
            "NAModule4" => Some(Self::Indoor),
            _ => None,
        }
    }

    pub fn vendor_type(self) -> &'static str {
        match self {
            Self::Main => "NAMain",
            Self::Outdoor => "NAModule1",
            Self::Wind => "NAModule2",
            Self::Rain => "NAModule3",
            Self::Indoor => "NAModule4",
        }
    }
}

/// Last-known metric values of one module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Readings {
    pub measured_at: Option<DateTime<Utc>>,
    pub temperature: Option<f64>,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub temperature_trend: Option<String>,
    pub humidity: Option<f64>,
    pub co2: Option<f64>,
    pub noise: Option<f64>,
    pub pressure: Option<f64>,
    pub pressure_trend: Option<String>,
    pub rain: Option<f64>,
    pub rain_1h: Option<f64>,
    pub rain_24h: Option<f64>,
    pub wind_strength: Option<f64>,
    pub wind_angle: Option<f64>,
    pub gust_strength: Option<f64>,
    pub gust_angle: Option<f64>,
}

/// One module of a station snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub id: String,
    pub kind: ModuleKind,
    pub name: Option<String>,
    pub reachable: bool,
    /// Wi-Fi level for the base station, RF level for modules.
    pub signal: Option<u16>,
    pub battery_percent: Option<u8>,
    pub firmware: Option<u32>,
    pub readings: Readings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UnitSystem {
    Metric,
    Imperial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum WindUnit {
    #[strum(serialize = "km/h")]
    Kph,
    #[strum(serialize = "mph")]
    Mph,
    #[strum(serialize = "m/s")]
    Ms,
    #[strum(serialize = "bft")]
    Beaufort,
    #[strum(serialize = "kn")]
    Knot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum PressureUnit {
    #[strum(serialize = "mbar")]
    Mbar,
    #[strum(serialize = "inHg")]
    InHg,
    #[strum(serialize = "mmHg")]
    MmHg,
}

impl UnitSystem {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Metric),
            1 => Some(Self::Imperial),
            _ => None,
        }
    }
}

impl WindUnit {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Kph),
            1 => Some(Self::Mph),
            2 => Some(Self::Ms),
            3 => Some(Self::Beaufort),
            4 => Some(Self::Knot),
            _ => None,
        }
    }
}

impl PressureUnit {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Mbar),
            1 => Some(Self::InHg),
            2 => Some(Self::MmHg),
            _ => None,
        }
    }
}

/// Account display preferences reported alongside station data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPrefs {
    pub lang: Option<String>,
    pub unit: Option<UnitSystem>,
    pub wind_unit: Option<WindUnit>,
    pub pressure_unit: Option<PressureUnit>,
}

/// Full station/module snapshot.
///
/// Replaced atomically on each successful fetch and never patched in
/// place. Consumers receive it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSnapshot {
    pub device_id: String,
    pub station_name: Option<String>,
    pub modules: BTreeMap<ModuleKind, ModuleRecord>,
    pub prefs: UserPrefs,
    pub fetched_at: DateTime<Utc>,
}

impl StationSnapshot {
    pub fn new(device_id: impl Into<String>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            device_id: device_id.into(),
            station_name: None,
            modules: BTreeMap::new(),
            prefs: UserPrefs::default(),
            fetched_at,
        }
    }

    pub fn module(&self, kind: ModuleKind) -> Option<&ModuleRecord> {
        self.modules.get(&kind)
    }

    /// Display name: station name, then the base module name, then the id.
    pub fn display_name(&self) -> &str {
        self.station_name
            .as_deref()
            .or_else(|| self.module(ModuleKind::Main).and_then(|m| m.name.as_deref()))
            .unwrap_or(&self.device_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn vendor_types_round_trip() {
        for kind in <ModuleKind as strum::IntoEnumIterator>::iter() {
            assert_eq!(ModuleKind::from_vendor_type(kind.vendor_type()), Some(kind));
        }
        assert_eq!(ModuleKind::from_vendor_type("NACamera"), None);
    }

    #[test]
    fn module_kind_parses_case_insensitively() {
        assert_eq!("Rain".parse::<ModuleKind>().unwrap(), ModuleKind::Rain);
        assert_eq!(ModuleKind::Outdoor.to_string(), "outdoor");
    }

    #[test]
    fn display_name_falls_back_to_device_id() {
        let snap = StationSnapshot::new("70:ee:50:00:00:01", Utc::now());
        assert_eq!(snap.display_name(), "70:ee:50:00:00:01");
    }

    #[test]
    fn unit_indices_outside_range_are_unknown() {
        assert_eq!(WindUnit::from_index(3), Some(WindUnit::Beaufort));
        assert_eq!(WindUnit::from_index(9), None);
        assert_eq!(PressureUnit::from_index(1), Some(PressureUnit::InHg));
        assert_eq!(UnitSystem::from_index(2), None);
        assert_eq!(WindUnit::Ms.to_string(), "m/s");
    }
}
