use thiserror::Error;

/// Top-level error type for the `weatherdash-api` crate.
///
/// Covers every failure mode of the vendor API: the OAuth token
/// endpoint, HTTP transport, the `{ "error": { code, message } }`
/// envelope returned by data endpoints, and payload decoding.
/// `weatherdash-core` classifies these into its auth/fetch taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── OAuth ───────────────────────────────────────────────────────
    /// The token endpoint rejected the grant (`invalid_grant`,
    /// `invalid_client`, ...). `error` is the OAuth error code.
    #[error("OAuth grant rejected (HTTP {status}): {error}")]
    OAuth {
        error: String,
        description: Option<String>,
        status: u16,
    },

    /// A refresh was requested before any client secret was known.
    #[error("No client secret available for the token exchange")]
    MissingClientSecret,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, ...)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Vendor API ──────────────────────────────────────────────────
    /// Structured error from a data endpoint.
    #[error("Vendor API error {code} (HTTP {status}): {message}")]
    Api {
        code: i64,
        message: String,
        status: u16,
    },

    /// Non-success HTTP status without a parseable error envelope.
    #[error("Unexpected HTTP {status}: {body}")]
    Http { status: u16, body: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

/// Vendor error codes that carry meaning for token handling.
pub mod api_code {
    pub const ACCESS_TOKEN_MISSING: i64 = 1;
    pub const INVALID_ACCESS_TOKEN: i64 = 2;
    pub const ACCESS_TOKEN_EXPIRED: i64 = 3;
    pub const DEVICE_NOT_FOUND: i64 = 9;
    pub const INVALID_ARGUMENT: i64 = 21;
    pub const USER_USAGE_REACHED: i64 = 26;
}

impl Error {
    /// Returns `true` if the access token is missing or no longer valid
    /// and only a fresh login can recover.
    pub fn is_token_invalid(&self) -> bool {
        matches!(
            self,
            Self::Api {
                code: api_code::ACCESS_TOKEN_MISSING | api_code::INVALID_ACCESS_TOKEN,
                ..
            }
        )
    }

    /// Returns `true` if the access token has merely expired and a
    /// refresh would resolve it.
    pub fn is_token_expired(&self) -> bool {
        matches!(
            self,
            Self::Api {
                code: api_code::ACCESS_TOKEN_EXPIRED,
                ..
            }
        )
    }

    /// Returns `true` if the OAuth endpoint said the grant itself is bad
    /// (wrong username/password, or a revoked refresh token).
    pub fn is_invalid_grant(&self) -> bool {
        matches!(self, Self::OAuth { error, .. } if error == "invalid_grant")
    }

    /// Returns `true` for failures where the request never got an answer
    /// from the vendor (connection refused, DNS, timeout).
    pub fn is_network(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    /// Extract the vendor error code, if available.
    pub fn api_error_code(&self) -> Option<i64> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}
