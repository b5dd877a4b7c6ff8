// ── Token domain types ──

use std::time::Duration;

use secrecy::SecretString;
use serde::Serialize;
use strum::Display;

/// Access/refresh token pair issued by the vendor.
///
/// Replaced wholesale on every refresh; the vendor rotates both tokens.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    /// Access token lifetime as reported by the vendor, if any.
    pub expires_in: Option<Duration>,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: SecretString::from(refresh_token.into()),
            expires_in: None,
        }
    }

    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = Some(expires_in);
        self
    }
}

/// Session authentication status as seen by consumers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "lowercase")]
pub enum AuthStatus {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
}

impl AuthStatus {
    pub fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated)
    }
}
