// Vendor API HTTP client
//
// Wraps `reqwest::Client` with base-URL handling, bearer-token
// injection, and vendor envelope unwrapping. Endpoint groups (OAuth,
// station data, measurements) are implemented as inherent methods in
// separate files to keep this module focused on transport mechanics.

use std::sync::{PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::ApiResponse;
use crate::transport::TransportConfig;

/// Production base URL of the vendor API.
pub const DEFAULT_BASE_URL: &str = "https://api.netatmo.com";

/// Data endpoints report failures as `{"error":{"code":N,"message":"..."}}`.
#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorInner,
}

#[derive(Deserialize)]
struct ApiErrorInner {
    code: i64,
    #[serde(default)]
    message: Option<String>,
}

/// Raw HTTP client for the weather-station vendor API.
///
/// Holds the OAuth application identity (`client_id` plus the client
/// secret once it is known) so token refreshes need nothing but the
/// refresh token itself. All data methods take the access token
/// explicitly; the client never caches user tokens.
pub struct NetatmoClient {
    http: reqwest::Client,
    base_url: Url,
    client_id: String,
    /// Application secret. Captured on a successful password grant or
    /// provided up front via [`with_client_secret`](Self::with_client_secret).
    client_secret: RwLock<Option<SecretString>>,
}

impl NetatmoClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(
        base_url: Url,
        client_id: impl Into<String>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, client_id))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, client_id: impl Into<String>) -> Self {
        Self {
            http,
            base_url,
            client_id: client_id.into(),
            client_secret: RwLock::new(None),
        }
    }

    /// Seed the application secret (e.g. resolved from the keyring) so a
    /// stored refresh token can be exchanged without a prior login.
    pub fn with_client_secret(self, secret: SecretString) -> Self {
        self.set_client_secret(secret);
        self
    }

    /// The OAuth application id.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── Client secret management ──────────────────────────────────────

    pub(crate) fn set_client_secret(&self, secret: SecretString) {
        debug!("storing client secret");
        *self
            .client_secret
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(secret);
    }

    pub(crate) fn client_secret(&self) -> Option<SecretString> {
        self.client_secret
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}{path}`, preserving any path prefix on the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let full = format!("{base}/{}", path.trim_start_matches('/'));
        Ok(Url::parse(&full)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send an authenticated GET and unwrap the `{ body, status }` envelope.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        access_token: &SecretString,
        query: &[(&str, String)],
    ) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .bearer_auth(access_token.expose_secret())
            .query(query)
            .send()
            .await?;

        let envelope: ApiResponse<T> = parse_response(resp).await?;
        Ok(envelope.body)
    }
}

/// Map the HTTP status and body onto either the decoded payload or a
/// classified [`Error`].
async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        if let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(&body) {
            return Err(Error::Api {
                code: envelope.error.code,
                message: envelope.error.message.unwrap_or_default(),
                status: status.as_u16(),
            });
        }
        return Err(Error::Http {
            status: status.as_u16(),
            body: preview(&body).to_owned(),
        });
    }

    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body: body.clone(),
    })
}

fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let client = NetatmoClient::with_client(
            reqwest::Client::new(),
            Url::parse("https://proxy.example/netatmo/").unwrap(),
            "app",
        );
        let url = client.endpoint("/api/getstationsdata").unwrap();
        assert_eq!(url.as_str(), "https://proxy.example/netatmo/api/getstationsdata");
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "é".repeat(150);
        let p = preview(&body);
        assert!(p.len() <= 200);
        assert!(body.starts_with(p));
    }
}
