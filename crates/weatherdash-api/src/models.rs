// Wire models for the vendor API
//
// These mirror the JSON exactly as the vendor sends it. Field names that
// are capitalised on the wire (`Temperature`, `CO2`, ...) are renamed to
// snake_case. Everything the vendor may omit is optional.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Success envelope shared by every data endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub body: T,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub time_server: Option<i64>,
}

// ── getstationsdata ─────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct StationDataBody {
    #[serde(default)]
    pub devices: Vec<RawStation>,
    #[serde(default)]
    pub user: Option<RawUser>,
}

/// A base station (`NAMain`) with its attached modules.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStation {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub station_name: Option<String>,
    #[serde(default)]
    pub module_name: Option<String>,
    #[serde(default)]
    pub reachable: Option<bool>,
    #[serde(default)]
    pub wifi_status: Option<u16>,
    #[serde(default)]
    pub firmware: Option<u32>,
    #[serde(default)]
    pub dashboard_data: Option<DashboardData>,
    #[serde(default)]
    pub modules: Vec<RawModule>,
}

/// A radio module attached to a base station.
#[derive(Debug, Clone, Deserialize)]
pub struct RawModule {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub module_name: Option<String>,
    #[serde(default)]
    pub reachable: Option<bool>,
    #[serde(default)]
    pub rf_status: Option<u16>,
    #[serde(default)]
    pub battery_percent: Option<u8>,
    #[serde(default)]
    pub battery_vp: Option<u32>,
    #[serde(default)]
    pub firmware: Option<u32>,
    #[serde(default)]
    pub dashboard_data: Option<DashboardData>,
}

/// Last-known readings. Which fields are present depends on the module type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    #[serde(default)]
    pub time_utc: Option<i64>,
    #[serde(default, rename = "Temperature")]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub min_temp: Option<f64>,
    #[serde(default)]
    pub max_temp: Option<f64>,
    #[serde(default)]
    pub temp_trend: Option<String>,
    #[serde(default, rename = "Humidity")]
    pub humidity: Option<f64>,
    #[serde(default, rename = "CO2")]
    pub co2: Option<f64>,
    #[serde(default, rename = "Noise")]
    pub noise: Option<f64>,
    #[serde(default, rename = "Pressure")]
    pub pressure: Option<f64>,
    #[serde(default, rename = "AbsolutePressure")]
    pub absolute_pressure: Option<f64>,
    #[serde(default)]
    pub pressure_trend: Option<String>,
    #[serde(default, rename = "Rain")]
    pub rain: Option<f64>,
    #[serde(default)]
    pub sum_rain_1: Option<f64>,
    #[serde(default)]
    pub sum_rain_24: Option<f64>,
    #[serde(default, rename = "WindStrength")]
    pub wind_strength: Option<f64>,
    #[serde(default, rename = "WindAngle")]
    pub wind_angle: Option<f64>,
    #[serde(default, rename = "GustStrength")]
    pub gust_strength: Option<f64>,
    #[serde(default, rename = "GustAngle")]
    pub gust_angle: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUser {
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default)]
    pub administrative: Option<RawAdministrative>,
}

/// Account preferences. Units are vendor enum indices.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAdministrative {
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub reg_locale: Option<String>,
    /// 0 = metric, 1 = imperial.
    #[serde(default)]
    pub unit: Option<u8>,
    /// 0 = kph, 1 = mph, 2 = m/s, 3 = beaufort, 4 = knot.
    #[serde(default)]
    pub windunit: Option<u8>,
    /// 0 = mbar, 1 = inHg, 2 = mmHg.
    #[serde(default)]
    pub pressureunit: Option<u8>,
}

// ── getmeasure ──────────────────────────────────────────────────────

/// `getmeasure` with `optimize=false` answers with a map of unix
/// timestamp → one value per requested type. With no data in range the
/// vendor sends an empty array instead of an empty object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawMeasureBody {
    Series(BTreeMap<String, Vec<Option<f64>>>),
    Empty(Vec<serde_json::Value>),
}

/// One decoded sample row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurePoint {
    /// Unix seconds.
    pub timestamp: i64,
    /// Values in the same order as the requested types.
    pub values: Vec<Option<f64>>,
}

/// Parameters for a `getmeasure` call.
#[derive(Debug, Clone)]
pub struct MeasureQuery {
    pub device_id: String,
    pub module_id: String,
    /// Vendor scale, e.g. `30min`, `1hour`, `1day`.
    pub scale: String,
    /// Vendor measurement types, e.g. `Rain`, `Temperature`.
    pub types: Vec<String>,
    /// Unix seconds.
    pub date_begin: i64,
    pub date_end: Option<i64>,
}
