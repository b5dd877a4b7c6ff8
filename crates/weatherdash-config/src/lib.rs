//! Shared configuration for the weatherdash CLI.
//!
//! TOML profiles, client-secret resolution (env + keyring + plaintext),
//! keyring-backed refresh-token persistence, and translation to
//! `weatherdash_core::SyncConfig`. The core crate never reads files; this
//! crate is where disk and OS credential stores come in.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use weatherdash_core::{PersistError, RefreshTokenStore, SyncConfig, SyncPolicy};

/// Keyring service name for every entry this crate writes.
pub const KEYRING_SERVICE: &str = "weatherdash";

/// Environment prefix for config overrides (`WEATHERDASH_DEFAULTS__TIMEOUT=10`).
pub const ENV_PREFIX: &str = "WEATHERDASH_";

/// Fallback environment variable for the OAuth client secret.
pub const CLIENT_SECRET_ENV: &str = "WEATHERDASH_CLIENT_SECRET";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found in config")]
    UnknownProfile { profile: String },

    #[error("no client secret configured for profile '{profile}'")]
    NoClientSecret { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// The profile to use: the explicit override, else `default_profile`,
    /// else `"default"`.
    pub fn active_profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Age in seconds after which a cached measurement is re-fetched.
    #[serde(default = "default_freshness")]
    pub freshness_secs: u64,

    /// Seconds before the reported expiry at which the access token is
    /// refreshed.
    #[serde(default = "default_refresh_margin")]
    pub refresh_margin_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            freshness_secs: default_freshness(),
            refresh_margin_secs: default_refresh_margin(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    weatherdash_core::config::DEFAULT_TIMEOUT.as_secs()
}
fn default_freshness() -> u64 {
    weatherdash_core::config::DEFAULT_FRESHNESS.as_secs()
}
fn default_refresh_margin() -> u64 {
    weatherdash_core::config::DEFAULT_REFRESH_MARGIN.as_secs()
}

/// A named Netatmo account profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// OAuth application id.
    #[serde(default)]
    pub client_id: String,

    /// OAuth application secret (plaintext, prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Environment variable name containing the client secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret_env: Option<String>,

    /// Account e-mail, used as the login prompt default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Override timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Override measurement freshness.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freshness_secs: Option<u64>,
}

fn default_api_url() -> String {
    weatherdash_api::DEFAULT_BASE_URL.into()
}

impl Profile {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            api_url: default_api_url(),
            client_id: client_id.into(),
            ..Self::default()
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "weatherdash", "weatherdash").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("weatherdash");
    p
}

// ── Config loading ──────────────────────────────────────────────────

fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the Config from `path` + environment. A missing file yields the
/// defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let config: Config = figment_for(path).extract()?;
    Ok(config)
}

/// Load config, returning a default if the file is unreadable.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Secrets ─────────────────────────────────────────────────────────

fn keyring_entry(profile_name: &str, item: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/{item}"))
}

/// Resolve the OAuth client secret for a profile.
///
/// Order: the profile's `client_secret_env` variable, then
/// `WEATHERDASH_CLIENT_SECRET`, then the system keyring, then the
/// plaintext value in the config file.
pub fn resolve_client_secret(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    // 1. Env vars
    let env_names = profile
        .client_secret_env
        .as_deref()
        .into_iter()
        .chain(std::iter::once(CLIENT_SECRET_ENV));
    for name in env_names {
        if let Ok(val) = std::env::var(name) {
            if !val.is_empty() {
                return Ok(SecretString::from(val));
            }
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name, "client-secret") {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref secret) = profile.client_secret {
        return Ok(SecretString::from(secret.clone()));
    }

    Err(ConfigError::NoClientSecret {
        profile: profile_name.into(),
    })
}

/// Save a client secret to the system keyring for `profile_name`.
pub fn store_client_secret(profile_name: &str, secret: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name, "client-secret")?.set_password(secret.expose_secret())?;
    Ok(())
}

/// Refresh-token persistence in the system keyring, one entry per profile
/// (`<profile>/refresh-token`).
pub struct KeyringTokenStore {
    profile: String,
}

impl KeyringTokenStore {
    pub fn new(profile_name: impl Into<String>) -> Self {
        Self {
            profile: profile_name.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, PersistError> {
        keyring_entry(&self.profile, "refresh-token").map_err(persist_error)
    }
}

fn persist_error(err: keyring::Error) -> PersistError {
    PersistError(err.to_string())
}

impl RefreshTokenStore for KeyringTokenStore {
    fn load(&self) -> Result<Option<SecretString>, PersistError> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(SecretString::from(token))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(persist_error(e)),
        }
    }

    fn save(&self, token: &SecretString) -> Result<(), PersistError> {
        self.entry()?
            .set_password(token.expose_secret())
            .map_err(persist_error)
    }

    fn delete(&self) -> Result<(), PersistError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(persist_error(e)),
        }
    }
}

// ── Translation to the core ─────────────────────────────────────────

/// Build a `SyncConfig` for the named profile.
///
/// The client secret is optional here: an interactive login supplies its
/// own, and only a restored session needs the stored one.
pub fn profile_to_sync_config(
    config: &Config,
    profile_name: &str,
) -> Result<SyncConfig, ConfigError> {
    let profile = config.profile(profile_name)?;

    let url: url::Url = profile
        .api_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("invalid URL: {}", profile.api_url),
        })?;

    if profile.client_id.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "client_id".into(),
            reason: "must not be empty".into(),
        });
    }

    let defaults = &config.defaults;
    let mut sync = SyncConfig::new(url, profile.client_id.clone());
    sync.client_secret = resolve_client_secret(profile, profile_name).ok();
    sync.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    sync.policy = SyncPolicy {
        freshness: Duration::from_secs(profile.freshness_secs.unwrap_or(defaults.freshness_secs)),
        refresh_margin: Duration::from_secs(defaults.refresh_margin_secs),
        ..SyncPolicy::default()
    };
    Ok(sync)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(toml: &str) -> Config {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(toml))
            .extract()
            .unwrap()
    }

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = parse("");
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.output, "table");
        assert_eq!(cfg.defaults.timeout, 30);
        assert_eq!(cfg.defaults.freshness_secs, 300);
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn profile_fields_parse() {
        let cfg = parse(
            r#"
            default_profile = "home"

            [defaults]
            freshness_secs = 120

            [profiles.home]
            client_id = "abc123"
            username = "alice@example.com"
            timeout = 10
            "#,
        );

        assert_eq!(cfg.active_profile_name(None), "home");
        assert_eq!(cfg.active_profile_name(Some("cabin")), "cabin");
        let home = cfg.profile("home").unwrap();
        assert_eq!(home.api_url, "https://api.netatmo.com");
        assert_eq!(home.client_id, "abc123");
        assert_eq!(home.username.as_deref(), Some("alice@example.com"));
        assert_eq!(cfg.defaults.freshness_secs, 120);
    }

    #[test]
    fn sync_config_applies_overrides() {
        let cfg = parse(
            r#"
            [defaults]
            timeout = 45
            refresh_margin_secs = 30

            [profiles.wd-test-sync]
            client_id = "abc123"
            client_secret = "plain"
            freshness_secs = 60
            "#,
        );

        let sync = profile_to_sync_config(&cfg, "wd-test-sync").unwrap();
        assert_eq!(sync.api_url.as_str(), "https://api.netatmo.com/");
        assert_eq!(sync.timeout, Duration::from_secs(45));
        assert_eq!(sync.policy.freshness, Duration::from_secs(60));
        assert_eq!(sync.policy.refresh_margin, Duration::from_secs(30));
        assert!(sync.client_secret.is_some());
    }

    #[test]
    fn sync_config_rejects_bad_profiles() {
        let cfg = parse(
            r#"
            [profiles.nourl]
            api_url = "not a url"
            client_id = "abc"

            [profiles.noid]
            client_id = "  "
            "#,
        );

        assert!(matches!(
            profile_to_sync_config(&cfg, "nourl"),
            Err(ConfigError::Validation { ref field, .. }) if field == "api_url"
        ));
        assert!(matches!(
            profile_to_sync_config(&cfg, "noid"),
            Err(ConfigError::Validation { ref field, .. }) if field == "client_id"
        ));
        assert!(matches!(
            profile_to_sync_config(&cfg, "missing"),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles
            .insert("default".into(), Profile::new("client-xyz"));
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        let profile = loaded.profile("default").unwrap();
        assert_eq!(profile.client_id, "client-xyz");
        assert_eq!(profile.client_secret, None);
    }
}
