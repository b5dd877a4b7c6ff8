//! CLI configuration: thin wrapper around `weatherdash_config`.
//!
//! Re-exports the shared types and adds resolution that respects
//! `GlobalOpts` flag overrides (--profile, --timeout).

use std::time::Duration;

use weatherdash_core::SyncConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use weatherdash_config::{
    Config, KeyringTokenStore, Profile, config_path, load_config, load_config_or_default,
    save_config, store_client_secret,
};

/// The active profile and the sync settings derived from it.
pub struct Resolved {
    pub name: String,
    pub profile: Profile,
    pub sync: SyncConfig,
}

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Comma-separated, sorted profile names for help text.
pub fn available_profiles(config: &Config) -> String {
    let mut names: Vec<_> = config.profiles.keys().cloned().collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort();
    names.join(", ")
}

/// Load the config file and translate the active profile into a
/// `SyncConfig`. Flag overrides take priority over profile values.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = load_config()?;
    let name = active_profile_name(global, &cfg);

    let Some(profile) = cfg.profiles.get(&name).cloned() else {
        if cfg.profiles.is_empty() {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
        return Err(CliError::ProfileNotFound {
            available: available_profiles(&cfg),
            name,
        });
    };

    let mut sync = weatherdash_config::profile_to_sync_config(&cfg, &name)?;
    if let Some(secs) = global.timeout {
        sync.timeout = Duration::from_secs(secs);
    }
    // Each command fetches what it renders.
    sync.policy.fetch_on_login = false;

    Ok(Resolved {
        name,
        profile,
        sync,
    })
}
