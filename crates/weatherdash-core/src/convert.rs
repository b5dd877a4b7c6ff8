// ── API-to-domain conversions ──
//
// Bridges raw `weatherdash_api` wire types into canonical domain types,
// and implements `VendorTransport` on top of `NetatmoClient`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use tracing::debug;

use weatherdash_api::models::{DashboardData, RawAdministrative, RawModule, RawStation};
use weatherdash_api::{MeasurePoint, MeasureQuery, NetatmoClient, StationDataBody, TokenResponse};

use crate::error::{AuthError, FetchError, NO_STATION_CODE};
use crate::model::{
    MeasurementKey, ModuleKind, ModuleRecord, PressureUnit, Readings, Sample, StationSnapshot,
    TimeSeries, TokenPair, UnitSystem, UserPrefs, WindUnit,
};
use crate::transport::VendorTransport;

// ── Tokens ───────────────────────────────────────────────────────────

impl From<TokenResponse> for TokenPair {
    fn from(t: TokenResponse) -> Self {
        Self {
            access_token: t.access_token,
            refresh_token: t.refresh_token,
            expires_in: t.expires_in,
        }
    }
}

// ── Station data ─────────────────────────────────────────────────────

fn timestamp(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| DateTime::from_timestamp(s, 0))
}

impl From<DashboardData> for Readings {
    fn from(d: DashboardData) -> Self {
        Self {
            measured_at: timestamp(d.time_utc),
            temperature: d.temperature,
            min_temperature: d.min_temp,
            max_temperature: d.max_temp,
            temperature_trend: d.temp_trend,
            humidity: d.humidity,
            co2: d.co2,
            noise: d.noise,
            pressure: d.pressure,
            pressure_trend: d.pressure_trend,
            rain: d.rain,
            rain_1h: d.sum_rain_1,
            rain_24h: d.sum_rain_24,
            wind_strength: d.wind_strength,
            wind_angle: d.wind_angle,
            gust_strength: d.gust_strength,
            gust_angle: d.gust_angle,
        }
    }
}

impl From<RawAdministrative> for UserPrefs {
    fn from(a: RawAdministrative) -> Self {
        Self {
            lang: a.lang,
            unit: a.unit.and_then(UnitSystem::from_index),
            wind_unit: a.windunit.and_then(WindUnit::from_index),
            pressure_unit: a.pressureunit.and_then(PressureUnit::from_index),
        }
    }
}

fn module_record(raw: RawModule) -> Option<ModuleRecord> {
    let Some(kind) = ModuleKind::from_vendor_type(&raw.kind) else {
        debug!(kind = %raw.kind, id = %raw.id, "skipping unknown module type");
        return None;
    };
    Some(ModuleRecord {
        id: raw.id,
        kind,
        name: raw.module_name,
        reachable: raw.reachable.unwrap_or(false),
        signal: raw.rf_status,
        battery_percent: raw.battery_percent,
        firmware: raw.firmware,
        readings: raw.dashboard_data.map(Readings::from).unwrap_or_default(),
    })
}

fn station_snapshot(
    station: RawStation,
    prefs: UserPrefs,
    fetched_at: DateTime<Utc>,
) -> StationSnapshot {
    let mut modules = BTreeMap::new();
    modules.insert(
        ModuleKind::Main,
        ModuleRecord {
            id: station.id.clone(),
            kind: ModuleKind::Main,
            name: station.module_name,
            reachable: station.reachable.unwrap_or(true),
            signal: station.wifi_status,
            battery_percent: None,
            firmware: station.firmware,
            readings: station
                .dashboard_data
                .map(Readings::from)
                .unwrap_or_default(),
        },
    );
    for record in station.modules.into_iter().filter_map(module_record) {
        // First module of a kind wins; the snapshot holds one per kind.
        modules.entry(record.kind).or_insert(record);
    }

    StationSnapshot {
        device_id: station.id,
        station_name: station.station_name,
        modules,
        prefs,
        fetched_at,
    }
}

/// Build a snapshot from the first station on the account.
pub fn snapshot_from_body(
    body: StationDataBody,
    fetched_at: DateTime<Utc>,
) -> Result<StationSnapshot, FetchError> {
    let prefs = body
        .user
        .and_then(|u| u.administrative)
        .map(UserPrefs::from)
        .unwrap_or_default();
    let station = body
        .devices
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::VendorRejected {
            code: NO_STATION_CODE,
            message: "no weather station on this account".into(),
        })?;
    Ok(station_snapshot(station, prefs, fetched_at))
}

// ── Measurements ─────────────────────────────────────────────────────

/// Vendor query for `key`, reaching back one timelapse window from `now`.
pub fn measure_query(key: &MeasurementKey, now: DateTime<Utc>) -> MeasureQuery {
    let window = chrono::Duration::from_std(key.timelapse().window()).unwrap_or_default();
    MeasureQuery {
        device_id: key.device_id().to_owned(),
        module_id: key.module_id().to_owned(),
        scale: key.timelapse().scale().to_owned(),
        types: key
            .metrics()
            .iter()
            .map(|m| m.vendor_name().to_owned())
            .collect(),
        date_begin: (now - window).timestamp(),
        date_end: None,
    }
}

pub fn time_series(key: &MeasurementKey, points: Vec<MeasurePoint>) -> TimeSeries {
    TimeSeries {
        metrics: key.metrics().to_vec(),
        samples: points
            .into_iter()
            .filter_map(|p| {
                DateTime::from_timestamp(p.timestamp, 0).map(|at| Sample {
                    at,
                    values: p.values,
                })
            })
            .collect(),
    }
}

// ── VendorTransport for the HTTP client ──────────────────────────────

impl VendorTransport for NetatmoClient {
    async fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
        secret: &SecretString,
    ) -> Result<TokenPair, AuthError> {
        let tokens = NetatmoClient::authenticate(self, username, password, secret).await?;
        Ok(tokens.into())
    }

    async fn refresh_token(&self, refresh_token: &SecretString) -> Result<TokenPair, AuthError> {
        let tokens = self.refresh(refresh_token).await?;
        Ok(tokens.into())
    }

    async fn get_station_data(
        &self,
        access_token: &SecretString,
    ) -> Result<StationSnapshot, FetchError> {
        let body = NetatmoClient::get_station_data(self, access_token).await?;
        snapshot_from_body(body, Utc::now())
    }

    async fn get_measurements(
        &self,
        access_token: &SecretString,
        key: &MeasurementKey,
    ) -> Result<TimeSeries, FetchError> {
        let query = measure_query(key, Utc::now());
        let points = self.get_measure(access_token, &query).await?;
        if points.is_empty() {
            return Err(FetchError::NoDataForRange);
        }
        Ok(time_series(key, points))
    }
}
