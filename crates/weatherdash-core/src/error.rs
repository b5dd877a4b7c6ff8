// ── Core error types ──
//
// Consumer-facing errors from weatherdash-core. These are NOT
// API-specific: callers never see HTTP statuses or OAuth error strings.
// The `From<weatherdash_api::Error>` impls classify transport-layer
// failures into the auth and fetch taxonomies. Both are `Clone` so one
// outcome can be fanned out to every waiter and stored in state.

use thiserror::Error;

use weatherdash_api::error::api_code;

/// Failure of a login or token refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid username, password or application secret")]
    InvalidCredentials,

    #[error("Network unavailable")]
    NetworkUnavailable,

    #[error("Login rejected by the vendor: {0}")]
    VendorRejected(String),

    #[error("A login is already in progress")]
    AlreadyInProgress,

    #[error("Cancelled")]
    Cancelled,

    #[error("No refresh token available")]
    NoRefreshToken,
}

/// Failure of a station or measurement fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Network unavailable")]
    NetworkUnavailable,

    #[error("Vendor error {code}: {message}")]
    VendorRejected { code: i64, message: String },

    #[error("Access token revoked")]
    TokenRevoked,

    #[error("Access token expired")]
    TokenExpired,

    #[error("No data for the requested range")]
    NoDataForRange,

    #[error("Cancelled")]
    Cancelled,
}

impl FetchError {
    /// Errors that invalidate the whole session rather than one request.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::TokenRevoked)
    }
}

/// Setup failure when building a coordinator from configuration.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Cannot build vendor client: {0}")]
    Client(#[from] weatherdash_api::Error),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<weatherdash_api::Error> for AuthError {
    fn from(err: weatherdash_api::Error) -> Self {
        if err.is_invalid_grant() {
            return AuthError::InvalidCredentials;
        }
        if err.is_network() {
            return AuthError::NetworkUnavailable;
        }
        match err {
            weatherdash_api::Error::OAuth {
                error,
                description: Some(description),
                ..
            } => AuthError::VendorRejected(format!("{error}: {description}")),
            weatherdash_api::Error::OAuth { error, .. } => AuthError::VendorRejected(error),
            weatherdash_api::Error::Http { status, .. } => {
                AuthError::VendorRejected(format!("HTTP {status}"))
            }
            other => AuthError::VendorRejected(other.to_string()),
        }
    }
}

impl From<weatherdash_api::Error> for FetchError {
    fn from(err: weatherdash_api::Error) -> Self {
        if err.is_token_invalid() {
            return FetchError::TokenRevoked;
        }
        if err.is_token_expired() {
            return FetchError::TokenExpired;
        }
        if err.is_network() {
            return FetchError::NetworkUnavailable;
        }
        match err {
            weatherdash_api::Error::Api { code, message, .. } => {
                FetchError::VendorRejected { code, message }
            }
            weatherdash_api::Error::Http { status, .. } => FetchError::VendorRejected {
                code: i64::from(status),
                message: format!("HTTP {status}"),
            },
            other => FetchError::VendorRejected {
                code: 0,
                message: other.to_string(),
            },
        }
    }
}

/// A fetch parked behind a token refresh fails with the refresh outcome.
impl From<AuthError> for FetchError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NetworkUnavailable => FetchError::NetworkUnavailable,
            AuthError::InvalidCredentials => FetchError::TokenRevoked,
            AuthError::NoRefreshToken => FetchError::NotAuthenticated,
            AuthError::VendorRejected(message) => FetchError::VendorRejected {
                code: 0,
                message,
            },
            AuthError::AlreadyInProgress | AuthError::Cancelled => FetchError::Cancelled,
        }
    }
}

/// Vendor code reported when an account has no station at all.
pub(crate) const NO_STATION_CODE: i64 = api_code::DEVICE_NOT_FOUND;

#[cfg(test)]
mod tests {
    use super::*;

    fn api(code: i64) -> weatherdash_api::Error {
        weatherdash_api::Error::Api {
            code,
            message: "boom".into(),
            status: 403,
        }
    }

    #[test]
    fn invalid_grant_is_invalid_credentials() {
        let err = weatherdash_api::Error::OAuth {
            error: "invalid_grant".into(),
            description: None,
            status: 400,
        };
        assert_eq!(AuthError::from(err), AuthError::InvalidCredentials);
    }

    #[test]
    fn other_oauth_errors_are_vendor_rejections() {
        let err = weatherdash_api::Error::OAuth {
            error: "invalid_client".into(),
            description: Some("unknown app".into()),
            status: 400,
        };
        assert_eq!(
            AuthError::from(err),
            AuthError::VendorRejected("invalid_client: unknown app".into())
        );
    }

    #[test]
    fn token_codes_classify() {
        assert_eq!(FetchError::from(api(1)), FetchError::TokenRevoked);
        assert_eq!(FetchError::from(api(2)), FetchError::TokenRevoked);
        assert_eq!(FetchError::from(api(3)), FetchError::TokenExpired);
        assert_eq!(
            FetchError::from(api(26)),
            FetchError::VendorRejected {
                code: 26,
                message: "boom".into()
            }
        );
    }

    #[test]
    fn http_status_becomes_vendor_code() {
        let err = weatherdash_api::Error::Http {
            status: 502,
            body: "Bad Gateway".into(),
        };
        assert!(matches!(
            FetchError::from(err),
            FetchError::VendorRejected { code: 502, .. }
        ));
    }

    #[test]
    fn refresh_failures_map_onto_parked_fetches() {
        assert_eq!(
            FetchError::from(AuthError::InvalidCredentials),
            FetchError::TokenRevoked
        );
        assert_eq!(
            FetchError::from(AuthError::NetworkUnavailable),
            FetchError::NetworkUnavailable
        );
        assert!(FetchError::TokenRevoked.is_session_fatal());
        assert!(!FetchError::NoDataForRange.is_session_fatal());
    }
}
