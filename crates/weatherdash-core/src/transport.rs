// ── Vendor transport seam ──
//
// Everything the coordinator needs from the vendor, expressed in domain
// types. `convert.rs` implements it for `NetatmoClient`; tests plug in
// a scripted mock.

use std::future::Future;

use secrecy::SecretString;

use crate::error::{AuthError, FetchError};
use crate::model::{MeasurementKey, StationSnapshot, TimeSeries, TokenPair};

/// Black-box vendor client: tokens in, typed data or typed errors out.
///
/// Implementations must not retry. Every call is issued from a task the
/// coordinator spawns, so the returned futures must be `Send`.
pub trait VendorTransport: Send + Sync + 'static {
    /// Password grant.
    fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
        secret: &SecretString,
    ) -> impl Future<Output = Result<TokenPair, AuthError>> + Send;

    /// Refresh-token grant.
    fn refresh_token(
        &self,
        refresh_token: &SecretString,
    ) -> impl Future<Output = Result<TokenPair, AuthError>> + Send;

    fn get_station_data(
        &self,
        access_token: &SecretString,
    ) -> impl Future<Output = Result<StationSnapshot, FetchError>> + Send;

    /// Time series for `key`. An empty range is `FetchError::NoDataForRange`.
    fn get_measurements(
        &self,
        access_token: &SecretString,
        key: &MeasurementKey,
    ) -> impl Future<Output = Result<TimeSeries, FetchError>> + Send;
}
