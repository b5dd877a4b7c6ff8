//! CLI error types with miette diagnostics.
//!
//! Maps core and config errors into user-facing errors with actionable
//! help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use weatherdash_config::ConfigError;
use weatherdash_core::{AuthError, CoreError, FetchError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the Netatmo API")]
    #[diagnostic(
        code(weatherdash::network),
        help("Check your network connection, or raise the request timeout with --timeout.")
    )]
    Network,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Not signed in for profile '{profile}'")]
    #[diagnostic(code(weatherdash::not_logged_in), help("Run: weatherdash login"))]
    NotLoggedIn { profile: String },

    #[error("Sign-in failed: {reason}")]
    #[diagnostic(
        code(weatherdash::auth_failed),
        help(
            "Check your e-mail and password, and the client id and secret of\n\
             your Netatmo app (https://dev.netatmo.com/apps)."
        )
    )]
    AuthFailed { reason: String },

    #[error("The session was revoked by Netatmo")]
    #[diagnostic(code(weatherdash::token_revoked), help("Sign in again with: weatherdash login"))]
    SessionRevoked,

    #[error("No client secret configured for profile '{profile}'")]
    #[diagnostic(
        code(weatherdash::no_client_secret),
        help(
            "Store it with: weatherdash config set-secret\n\
             Or set WEATHERDASH_CLIENT_SECRET."
        )
    )]
    NoClientSecret { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(weatherdash::not_found),
        help("Run: weatherdash {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Netatmo API error ({code}): {message}")]
    #[diagnostic(code(weatherdash::api_error))]
    ApiError { code: i64, message: String },

    #[error("Interrupted")]
    #[diagnostic(code(weatherdash::cancelled))]
    Cancelled,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(weatherdash::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(weatherdash::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: weatherdash config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(weatherdash::no_config),
        help(
            "Create one with: weatherdash config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(weatherdash::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(weatherdash::render))]
    Render(String),
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Render(err.to_string())
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Render(err.to_string())
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Network => exit_code::CONNECTION,
            Self::NotLoggedIn { .. }
            | Self::AuthFailed { .. }
            | Self::SessionRevoked
            | Self::NoClientSecret { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Library error → CliError mapping ─────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoClientSecret { profile } => Self::NoClientSecret { profile },
            ConfigError::UnknownProfile { profile } => Self::ProfileNotFound {
                name: profile,
                available: String::new(),
            },
            other => Self::Config(Box::new(other)),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Client(e) => Self::Validation {
                field: "client".into(),
                reason: e.to_string(),
            },
        }
    }
}

impl From<AuthError> for CliError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NetworkUnavailable => Self::Network,
            AuthError::Cancelled => Self::Cancelled,
            AuthError::NoRefreshToken => Self::NotLoggedIn {
                profile: "current".into(),
            },
            other => Self::AuthFailed {
                reason: other.to_string(),
            },
        }
    }
}

impl From<FetchError> for CliError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotAuthenticated => Self::NotLoggedIn {
                profile: "current".into(),
            },
            FetchError::NetworkUnavailable => Self::Network,
            FetchError::TokenRevoked | FetchError::TokenExpired => Self::SessionRevoked,
            FetchError::VendorRejected { code, message } => Self::ApiError { code, message },
            FetchError::NoDataForRange => Self::NotFound {
                resource_type: "measurement".into(),
                identifier: "requested range".into(),
                list_command: "measure --range 1m".into(),
            },
            FetchError::Cancelled => Self::Cancelled,
        }
    }
}
