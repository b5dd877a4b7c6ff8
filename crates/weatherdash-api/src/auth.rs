// OAuth token endpoint
//
// Password grant (username + password + application secret) and
// refresh-token grant. Both go to the same form-encoded endpoint and
// return the same token document.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::client::NetatmoClient;
use crate::error::Error;

/// Scope requested on login: read access to weather stations.
pub const STATION_SCOPE: &str = "read_station";

const TOKEN_PATH: &str = "/oauth2/token";

#[derive(Deserialize)]
struct RawTokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Tokens issued by a successful grant.
#[derive(Debug, Clone)]
pub struct TokenResponse {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    /// Lifetime of the access token as reported by the vendor.
    pub expires_in: Option<Duration>,
}

impl From<RawTokenResponse> for TokenResponse {
    fn from(raw: RawTokenResponse) -> Self {
        Self {
            access_token: SecretString::from(raw.access_token),
            refresh_token: SecretString::from(raw.refresh_token),
            expires_in: raw.expires_in.map(Duration::from_secs),
        }
    }
}

impl NetatmoClient {
    /// Exchange user credentials for a token pair (password grant).
    ///
    /// `client_secret` is the application secret paired with this
    /// client's `client_id`. On success it is retained so later calls
    /// to [`refresh`](Self::refresh) need only the refresh token.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
        client_secret: &SecretString,
    ) -> Result<TokenResponse, Error> {
        debug!(username, "requesting password grant");

        let form = [
            ("grant_type", "password"),
            ("client_id", self.client_id()),
            ("client_secret", client_secret.expose_secret()),
            ("username", username),
            ("password", password.expose_secret()),
            ("scope", STATION_SCOPE),
        ];
        let tokens = self.token_request(&form).await?;

        self.set_client_secret(client_secret.clone());
        debug!("password grant successful");
        Ok(tokens)
    }

    /// Exchange a refresh token for a new token pair.
    ///
    /// The vendor rotates refresh tokens: the returned pair replaces the
    /// old one wholesale.
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenResponse, Error> {
        let client_secret = self.client_secret().ok_or(Error::MissingClientSecret)?;

        debug!("requesting refresh grant");

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.expose_secret()),
            ("client_id", self.client_id()),
            ("client_secret", client_secret.expose_secret()),
        ];
        let tokens = self.token_request(&form).await?;

        debug!("refresh grant successful");
        Ok(tokens)
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, Error> {
        let url = self.endpoint(TOKEN_PATH)?;

        let resp = self.http().post(url).form(form).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<OAuthErrorBody>(&body) {
                Ok(err) => Error::OAuth {
                    error: err.error,
                    description: err.error_description,
                    status: status.as_u16(),
                },
                Err(_) => Error::Http {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        let raw: RawTokenResponse =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: String::new(),
            })?;
        Ok(raw.into())
    }
}
