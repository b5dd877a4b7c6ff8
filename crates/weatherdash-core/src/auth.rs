// ── Authentication session ──
//
// Login and refresh bookkeeping around the `TokenStore`. This type does
// no I/O: the coordinator asks it whether a vendor call may start, runs
// the call, and reports the outcome back. That keeps the in-flight rules
// (one login at a time, refreshes deduplicated) in one place.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::AuthError;
use crate::model::{AuthStatus, TokenPair};
use crate::token_store::TokenStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    /// Password grant in flight.
    LoggingIn,
    /// Refresh of a persisted token in flight, at startup.
    Restoring,
}

pub struct AuthSession {
    store: TokenStore,
    phase: Phase,
    refresh_in_flight: bool,
    refresh_margin: Duration,
}

impl AuthSession {
    pub fn new(store: TokenStore, refresh_margin: Duration) -> Self {
        Self {
            store,
            phase: Phase::Idle,
            refresh_in_flight: false,
            refresh_margin,
        }
    }

    pub fn status(&self) -> AuthStatus {
        match self.phase {
            Phase::LoggingIn | Phase::Restoring => AuthStatus::Authenticating,
            Phase::Idle if self.store.is_authenticated() => AuthStatus::Authenticated,
            Phase::Idle => AuthStatus::Unauthenticated,
        }
    }

    pub fn tokens(&self) -> Option<&TokenPair> {
        self.store.get()
    }

    /// Access token to use for a fetch, if authenticated.
    pub fn access_token(&self) -> Option<SecretString> {
        match self.status() {
            AuthStatus::Authenticated => self.store.get().map(|t| t.access_token.clone()),
            _ => None,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.store.is_expired(now, self.refresh_margin)
    }

    pub fn mark_expired(&mut self) {
        self.store.mark_expired();
    }

    pub fn is_restoring(&self) -> bool {
        self.phase == Phase::Restoring
    }

    pub fn refresh_in_flight(&self) -> bool {
        self.refresh_in_flight
    }

    // ── Login ────────────────────────────────────────────────────────

    /// Admit a login attempt.
    ///
    /// Rejects a second attempt while one is pending, and empty fields
    /// before any network call is made.
    pub fn begin_login(
        &mut self,
        username: &str,
        password: &SecretString,
        secret: &SecretString,
    ) -> Result<(), AuthError> {
        if self.phase != Phase::Idle {
            return Err(AuthError::AlreadyInProgress);
        }
        if username.trim().is_empty()
            || password.expose_secret().is_empty()
            || secret.expose_secret().is_empty()
        {
            return Err(AuthError::InvalidCredentials);
        }
        self.phase = Phase::LoggingIn;
        debug!(username, "login started");
        Ok(())
    }

    pub fn finish_login(
        &mut self,
        result: Result<TokenPair, AuthError>,
    ) -> Result<TokenPair, AuthError> {
        self.phase = Phase::Idle;
        if let Ok(tokens) = &result {
            self.store.set(tokens.clone());
            info!("logged in");
        }
        result
    }

    // ── Refresh ──────────────────────────────────────────────────────

    /// Admit a refresh.
    ///
    /// Returns the refresh token to send, or `None` when a refresh is
    /// already in flight and the caller should wait for that one.
    pub fn begin_refresh(&mut self) -> Result<Option<SecretString>, AuthError> {
        if self.refresh_in_flight {
            return Ok(None);
        }
        let token = self
            .store
            .get()
            .map(|t| t.refresh_token.clone())
            .ok_or(AuthError::NoRefreshToken)?;
        self.refresh_in_flight = true;
        debug!("token refresh started");
        Ok(Some(token))
    }

    /// Start restoring a session from a persisted refresh token.
    pub fn begin_restore(&mut self) -> Option<SecretString> {
        if self.phase != Phase::Idle || self.store.is_authenticated() {
            return None;
        }
        let token = self.store.load_persisted()?;
        self.phase = Phase::Restoring;
        self.refresh_in_flight = true;
        info!("restoring session from persisted refresh token");
        Some(token)
    }

    pub fn finish_refresh(
        &mut self,
        result: Result<TokenPair, AuthError>,
    ) -> Result<TokenPair, AuthError> {
        self.refresh_in_flight = false;
        if self.phase == Phase::Restoring {
            self.phase = Phase::Idle;
        }
        if let Ok(tokens) = &result {
            self.store.set(tokens.clone());
            debug!("token refresh complete");
        }
        result
    }

    // ── Sign-out ─────────────────────────────────────────────────────

    /// Return to `Unauthenticated`. `forget` also deletes the persisted
    /// refresh token.
    pub fn sign_out(&mut self, forget: bool) {
        if forget {
            self.store.clear();
        } else {
            self.store.discard();
        }
        self.phase = Phase::Idle;
        self.refresh_in_flight = false;
    }
}
