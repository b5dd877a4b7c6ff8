// ── Runtime sync configuration ──
//
// These types describe how to reach the vendor and how eagerly to
// re-fetch. They carry credential data and tuning, but never touch
// disk. The CLI builds a `SyncConfig` from its profile and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Default maximum age of a `Ready` measurement before it is re-fetched.
pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(5 * 60);

/// Default head start for treating an access token as expired.
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Default HTTP request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Policy knobs of the coordinator. Independent of any transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Maximum age of a `Ready` measurement entry before a repeated
    /// request counts as a miss.
    pub freshness: Duration,
    /// An access token is treated as expired this long before the
    /// vendor-reported deadline.
    pub refresh_margin: Duration,
    /// Fetch station data right after an interactive login, not only
    /// after a session restore.
    pub fetch_on_login: bool,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            freshness: DEFAULT_FRESHNESS,
            refresh_margin: DEFAULT_REFRESH_MARGIN,
            fetch_on_login: true,
        }
    }
}

/// Configuration for syncing against one vendor account.
///
/// Built by the CLI, passed to `SyncCoordinator::connect`. Core never
/// reads config files.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Vendor API base URL.
    pub api_url: Url,
    /// OAuth application id.
    pub client_id: String,
    /// OAuth application secret. Needed to refresh a restored session;
    /// an interactive login supplies its own.
    pub client_secret: Option<SecretString>,
    /// HTTP request timeout.
    pub timeout: Duration,
    pub policy: SyncPolicy,
}

impl SyncConfig {
    pub fn new(api_url: Url, client_id: impl Into<String>) -> Self {
        Self {
            api_url,
            client_id: client_id.into(),
            client_secret: None,
            timeout: DEFAULT_TIMEOUT,
            policy: SyncPolicy::default(),
        }
    }
}
