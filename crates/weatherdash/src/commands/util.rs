//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use weatherdash_core::{
    AuthError, AuthStatus, ModuleKind, ModuleRecord, StationSnapshot, SyncCoordinator, SyncHandle,
    SyncState,
};

use crate::cli::GlobalOpts;
use crate::config::{self, KeyringTokenStore, Resolved};
use crate::error::CliError;

/// A running coordinator bound to the active profile.
pub struct Session {
    pub handle: SyncHandle,
    pub resolved: Resolved,
}

impl Session {
    pub fn profile(&self) -> &str {
        &self.resolved.name
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.handle.shutdown();
    }
}

/// Start a coordinator for the active profile and wait until a persisted
/// session has been restored (or failed to).
pub async fn start(global: &GlobalOpts) -> Result<Session, CliError> {
    let resolved = config::resolve(global)?;
    let store = Arc::new(KeyringTokenStore::new(resolved.name.clone()));
    let handle = SyncCoordinator::connect(&resolved.sync, store)?;

    let spinner = spinner("Restoring session...", global.quiet);
    wait_settled(&handle).await;
    spinner.finish_and_clear();

    Ok(Session { handle, resolved })
}

/// Like [`start`], but fails unless the restored session is usable.
pub async fn connect(global: &GlobalOpts) -> Result<Session, CliError> {
    let session = start(global).await?;
    let state = session.handle.state();
    if state.is_authenticated() {
        return Ok(session);
    }
    match state.last_auth_error {
        Some(AuthError::NetworkUnavailable) => Err(CliError::Network),
        _ => Err(CliError::NotLoggedIn {
            profile: session.profile().to_owned(),
        }),
    }
}

/// Wait until the coordinator is no longer signing in.
pub async fn wait_settled(handle: &SyncHandle) -> Arc<SyncState> {
    let mut rx = handle.subscribe();
    match rx.wait_for(|s| s.auth != AuthStatus::Authenticating).await {
        Ok(state) => Arc::clone(&state),
        Err(_) => handle.state(),
    }
}

/// Current station snapshot: joins the fetch a session restore started,
/// or issues a new one.
pub async fn station(handle: &SyncHandle) -> Result<Arc<StationSnapshot>, CliError> {
    let state = handle.state();
    if let (Some(snapshot), false) = (&state.station, state.loading_station_data) {
        return Ok(Arc::clone(snapshot));
    }
    Ok(handle.fetch_station_data().await?)
}

/// Resolve a module by kind (`outdoor`) or id (`02:00:00:aa:bb:cc`).
pub fn resolve_module<'a>(
    snapshot: &'a StationSnapshot,
    identifier: &str,
) -> Result<&'a ModuleRecord, CliError> {
    let by_kind = identifier
        .parse::<ModuleKind>()
        .ok()
        .and_then(|kind| snapshot.module(kind));
    by_kind
        .or_else(|| {
            snapshot
                .modules
                .values()
                .find(|m| m.id.eq_ignore_ascii_case(identifier))
        })
        .ok_or_else(|| CliError::NotFound {
            resource_type: "module".into(),
            identifier: identifier.into(),
            list_command: "station".into(),
        })
}

/// A stderr spinner, hidden in quiet mode or when stderr is not a terminal.
pub fn spinner(message: &'static str, quiet: bool) -> ProgressBar {
    if quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use weatherdash_core::Readings;

    use super::*;

    fn module(id: &str, kind: ModuleKind) -> ModuleRecord {
        ModuleRecord {
            id: id.into(),
            kind,
            name: None,
            reachable: true,
            signal: None,
            battery_percent: None,
            firmware: None,
            readings: Readings::default(),
        }
    }

    #[test]
    fn module_resolves_by_kind_or_id() {
        let mut snap = StationSnapshot::new("70:ee:50:00:00:01", Utc::now());
        snap.modules
            .insert(ModuleKind::Main, module("70:ee:50:00:00:01", ModuleKind::Main));
        snap.modules
            .insert(ModuleKind::Outdoor, module("02:00:00:00:00:aa", ModuleKind::Outdoor));

        assert_eq!(resolve_module(&snap, "Outdoor").unwrap().id, "02:00:00:00:00:aa");
        assert_eq!(
            resolve_module(&snap, "02:00:00:00:00:AA").unwrap().kind,
            ModuleKind::Outdoor
        );
        assert!(matches!(
            resolve_module(&snap, "rain"),
            Err(CliError::NotFound { .. })
        ));
    }
}
