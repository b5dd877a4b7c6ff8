// weatherdash-api: Async Rust client for the Netatmo weather station API

pub mod auth;
pub mod client;
pub mod error;
pub mod measure;
pub mod models;
pub mod station;
pub mod transport;

pub use auth::{STATION_SCOPE, TokenResponse};
pub use client::{DEFAULT_BASE_URL, NetatmoClient};
pub use error::Error;
pub use models::{
    DashboardData, MeasurePoint, MeasureQuery, RawAdministrative, RawModule, RawStation, RawUser,
    StationDataBody,
};
pub use transport::TransportConfig;
