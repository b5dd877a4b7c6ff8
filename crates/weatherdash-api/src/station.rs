// Station data endpoint
//
// `getstationsdata` returns every station the account can see, each with
// its attached modules and last-known readings, plus the account's
// administrative preferences.

use secrecy::SecretString;

use crate::client::NetatmoClient;
use crate::error::Error;
use crate::models::StationDataBody;

impl NetatmoClient {
    /// Fetch all stations and modules visible to the token's owner.
    pub async fn get_station_data(
        &self,
        access_token: &SecretString,
    ) -> Result<StationDataBody, Error> {
        let url = self.endpoint("/api/getstationsdata")?;
        self.get(url, access_token, &[]).await
    }

    /// Fetch a single station by id.
    pub async fn get_station(
        &self,
        access_token: &SecretString,
        device_id: &str,
    ) -> Result<StationDataBody, Error> {
        let url = self.endpoint("/api/getstationsdata")?;
        self.get(url, access_token, &[("device_id", device_id.to_owned())])
            .await
    }
}
