// ── Token storage ──
//
// `TokenStore` is the in-memory owner of the current token pair. The
// refresh token is mirrored into a `RefreshTokenStore` so a later run
// can restore the session; persistence failures are logged and never
// fail the caller.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::model::TokenPair;

/// Failure of a durable refresh-token backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Credential store error: {0}")]
pub struct PersistError(pub String);

/// Durable storage for the refresh token, under one fixed name.
pub trait RefreshTokenStore: Send + Sync {
    fn load(&self) -> Result<Option<SecretString>, PersistError>;
    fn save(&self, token: &SecretString) -> Result<(), PersistError>;
    fn delete(&self) -> Result<(), PersistError>;
}

/// Process-local `RefreshTokenStore`. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<SecretString>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `token`, as if left by an earlier run.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(SecretString::from(token.into()))),
        }
    }
}

impl RefreshTokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<SecretString>, PersistError> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, token: &SecretString) -> Result<(), PersistError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        Ok(())
    }

    fn delete(&self) -> Result<(), PersistError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Holder of the live token pair.
///
/// `access_token` is present iff a pair is stored; the session is
/// authenticated exactly while it is.
pub struct TokenStore {
    tokens: Option<TokenPair>,
    expires_at: Option<Instant>,
    persistence: Arc<dyn RefreshTokenStore>,
}

impl TokenStore {
    pub fn new(persistence: Arc<dyn RefreshTokenStore>) -> Self {
        Self {
            tokens: None,
            expires_at: None,
            persistence,
        }
    }

    /// Replace the stored pair and persist its refresh token.
    pub fn set(&mut self, tokens: TokenPair) {
        self.expires_at = tokens.expires_in.map(|ttl| Instant::now() + ttl);
        if let Err(e) = self.persistence.save(&tokens.refresh_token) {
            warn!(error = %e, "failed to persist refresh token");
        }
        self.tokens = Some(tokens);
        debug!("token pair stored");
    }

    /// Drop the stored pair and the persisted refresh token.
    pub fn clear(&mut self) {
        self.discard();
        if let Err(e) = self.persistence.delete() {
            warn!(error = %e, "failed to delete persisted refresh token");
        }
    }

    /// Drop the in-memory pair, leaving the persisted refresh token alone.
    pub fn discard(&mut self) {
        self.tokens = None;
        self.expires_at = None;
    }

    pub fn get(&self) -> Option<&TokenPair> {
        self.tokens.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens.is_some()
    }

    /// `true` when the access token's deadline, less `margin`, has passed.
    /// A pair without a reported lifetime never expires on its own.
    pub fn is_expired(&self, now: Instant, margin: Duration) -> bool {
        match (self.tokens.as_ref(), self.expires_at) {
            (Some(_), Some(deadline)) => now + margin >= deadline,
            _ => false,
        }
    }

    /// Force the current access token to count as expired.
    pub fn mark_expired(&mut self) {
        if self.tokens.is_some() {
            self.expires_at = Some(Instant::now());
        }
    }

    /// Refresh token left by an earlier session, if any.
    pub fn load_persisted(&self) -> Option<SecretString> {
        self.persistence.load().unwrap_or_else(|e| {
            warn!(error = %e, "failed to read persisted refresh token");
            None
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn store() -> (Arc<MemoryTokenStore>, TokenStore) {
        let backend = Arc::new(MemoryTokenStore::new());
        let store = TokenStore::new(backend.clone());
        (backend, store)
    }

    #[test]
    fn set_persists_refresh_token() {
        let (backend, mut store) = store();
        store.set(TokenPair::new("acc", "ref"));

        assert!(store.is_authenticated());
        assert_eq!(store.get().unwrap().access_token.expose_secret(), "acc");
        assert_eq!(backend.load().unwrap().unwrap().expose_secret(), "ref");
    }

    #[test]
    fn clear_removes_persisted_token() {
        let (backend, mut store) = store();
        store.set(TokenPair::new("acc", "ref"));
        store.clear();

        assert!(store.get().is_none());
        assert!(backend.load().unwrap().is_none());
    }

    #[test]
    fn discard_keeps_persisted_token() {
        let (backend, mut store) = store();
        store.set(TokenPair::new("acc", "ref"));
        store.discard();

        assert!(!store.is_authenticated());
        assert!(backend.load().unwrap().is_some());
        assert!(store.load_persisted().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_honours_margin() {
        let (_backend, mut store) = store();
        store.set(TokenPair::new("acc", "ref").with_expires_in(Duration::from_secs(120)));
        let margin = Duration::from_secs(60);

        assert!(!store.is_expired(Instant::now(), margin));
        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!store.is_expired(Instant::now(), margin));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(store.is_expired(Instant::now(), margin));
    }

    #[test]
    fn no_lifetime_never_expires() {
        let (_backend, mut store) = store();
        store.set(TokenPair::new("acc", "ref"));
        assert!(!store.is_expired(Instant::now(), Duration::from_secs(3600)));

        store.mark_expired();
        assert!(store.is_expired(Instant::now(), Duration::ZERO));
    }
}
