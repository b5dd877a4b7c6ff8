// ── Sync coordinator ──
//
// Single-writer actor owning the auth session, station sync and
// measurement cache. Consumers talk to it through a cloneable
// `SyncHandle`; vendor calls run in spawned tasks and report back over a
// completion channel, tagged with the epoch they were started in. Every
// transition republishes one merged `SyncState`.

use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use weatherdash_api::error::api_code;
use weatherdash_api::{NetatmoClient, TransportConfig};

use crate::auth::AuthSession;
use crate::cache::{MeasureDispatch, MeasurementCache};
use crate::config::{SyncConfig, SyncPolicy};
use crate::error::{AuthError, CoreError, FetchError};
use crate::model::{
    AuthStatus, MeasurementCacheEntry, MeasurementKey, MetricType, StationSnapshot, Timelapse,
    TimeSeries, TokenPair,
};
use crate::state::SyncState;
use crate::station::StationDataSync;
use crate::stream::StateStream;
use crate::token_store::{RefreshTokenStore, TokenStore};
use crate::transport::VendorTransport;

type AuthReply = oneshot::Sender<Result<TokenPair, AuthError>>;
type StationReply = oneshot::Sender<Result<Arc<StationSnapshot>, FetchError>>;

// ── Mailbox messages ─────────────────────────────────────────────────

enum Request {
    Login {
        username: String,
        password: SecretString,
        secret: SecretString,
        reply: AuthReply,
    },
    Logout {
        reply: oneshot::Sender<()>,
    },
    Refresh {
        reply: AuthReply,
    },
    FetchStation {
        reply: StationReply,
    },
    FetchMeasure {
        key: MeasurementKey,
    },
    Invalidate {
        key: MeasurementKey,
    },
    Flush {
        reply: oneshot::Sender<()>,
    },
}

enum Completion {
    Login {
        epoch: u64,
        result: Result<TokenPair, AuthError>,
    },
    Refresh {
        epoch: u64,
        result: Result<TokenPair, AuthError>,
    },
    Station {
        epoch: u64,
        result: Result<StationSnapshot, FetchError>,
    },
    Measure {
        dispatch: MeasureDispatch,
        result: Result<TimeSeries, FetchError>,
    },
}

/// A fetch waiting for a token refresh before it can be sent.
enum Parked {
    Station,
    Measure(MeasureDispatch),
}

// ── SyncCoordinator ──────────────────────────────────────────────────

/// Entry point: starts the coordinator actor and returns its handle.
pub struct SyncCoordinator;

impl SyncCoordinator {
    /// Spawn the coordinator on the current tokio runtime.
    ///
    /// If `persistence` holds a refresh token from an earlier run, the
    /// session starts in `Authenticating` and is restored in the
    /// background; station data is fetched once it succeeds.
    pub fn spawn<T: VendorTransport>(
        transport: T,
        policy: SyncPolicy,
        persistence: Arc<dyn RefreshTokenStore>,
    ) -> SyncHandle {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(Arc::new(SyncState::default()));
        let cancel = CancellationToken::new();

        let mut actor = SyncActor {
            transport: Arc::new(transport),
            auth: AuthSession::new(TokenStore::new(persistence), policy.refresh_margin),
            station: StationDataSync::new(),
            cache: MeasurementCache::new(policy.freshness),
            policy,
            last_auth_error: None,
            login_waiter: None,
            refresh_waiters: Vec::new(),
            station_waiters: Vec::new(),
            parked: Vec::new(),
            state_tx,
            completions: completion_tx,
        };
        actor.restore();
        actor.publish();

        tokio::spawn(actor.run(request_rx, completion_rx, cancel.clone()));

        SyncHandle {
            requests: request_tx,
            state: state_rx,
            cancel,
        }
    }

    /// Build the HTTP client from `config` and spawn a coordinator on it.
    pub fn connect(
        config: &SyncConfig,
        persistence: Arc<dyn RefreshTokenStore>,
    ) -> Result<SyncHandle, CoreError> {
        if config.client_id.trim().is_empty() {
            return Err(CoreError::Config {
                message: "client_id must not be empty".into(),
            });
        }

        let transport = TransportConfig::with_timeout(config.timeout);
        let mut client =
            NetatmoClient::new(config.api_url.clone(), config.client_id.clone(), &transport)?;
        if let Some(secret) = &config.client_secret {
            client = client.with_client_secret(secret.clone());
        }

        debug!(url = %config.api_url, "starting sync coordinator");
        Ok(Self::spawn(client, config.policy.clone(), persistence))
    }
}

// ── SyncHandle ───────────────────────────────────────────────────────

/// Cloneable consumer handle to a running coordinator.
///
/// Every method is safe to call after shutdown: awaiting calls report
/// `Cancelled`, fire-and-forget calls do nothing.
#[derive(Clone)]
pub struct SyncHandle {
    requests: mpsc::UnboundedSender<Request>,
    state: watch::Receiver<Arc<SyncState>>,
    cancel: CancellationToken,
}

impl SyncHandle {
    fn send(&self, request: Request) -> bool {
        !self.cancel.is_cancelled() && self.requests.send(request).is_ok()
    }

    // ── Triggers ─────────────────────────────────────────────────────

    /// Exchange credentials for a token pair.
    pub async fn login(
        &self,
        username: impl Into<String>,
        password: SecretString,
        secret: SecretString,
    ) -> Result<TokenPair, AuthError> {
        let (reply, rx) = oneshot::channel();
        let request = Request::Login {
            username: username.into(),
            password,
            secret,
            reply,
        };
        if !self.send(request) {
            return Err(AuthError::Cancelled);
        }
        rx.await.unwrap_or(Err(AuthError::Cancelled))
    }

    /// Sign out, drop all data and delete the persisted refresh token.
    /// Pending login, refresh and station callers receive `Cancelled`.
    pub async fn logout(&self) {
        let (reply, rx) = oneshot::channel();
        if self.send(Request::Logout { reply }) {
            let _ = rx.await;
        }
    }

    /// Exchange the refresh token for a new pair. Joins a refresh that is
    /// already in flight.
    pub async fn refresh(&self) -> Result<TokenPair, AuthError> {
        let (reply, rx) = oneshot::channel();
        if !self.send(Request::Refresh { reply }) {
            return Err(AuthError::Cancelled);
        }
        rx.await.unwrap_or(Err(AuthError::Cancelled))
    }

    /// Fetch the station snapshot. Joins a fetch that is already in flight.
    pub async fn fetch_station_data(&self) -> Result<Arc<StationSnapshot>, FetchError> {
        let (reply, rx) = oneshot::channel();
        if !self.send(Request::FetchStation { reply }) {
            return Err(FetchError::Cancelled);
        }
        rx.await.unwrap_or(Err(FetchError::Cancelled))
    }

    /// Request measurements. Fire-and-forget: the outcome shows up in the
    /// entry for the returned key.
    pub fn fetch_measure(
        &self,
        device_id: impl Into<String>,
        module_id: impl Into<String>,
        metrics: impl IntoIterator<Item = MetricType>,
        timelapse: Timelapse,
    ) -> MeasurementKey {
        let key = MeasurementKey::new(device_id, module_id, metrics, timelapse);
        self.request_measure(key.clone());
        key
    }

    /// [`fetch_measure`](Self::fetch_measure) for an already built key.
    pub fn request_measure(&self, key: MeasurementKey) {
        self.send(Request::FetchMeasure { key });
    }

    /// Make the next fetch of `key` bypass the freshness check.
    pub fn invalidate(&self, key: &MeasurementKey) {
        self.send(Request::Invalidate { key: key.clone() });
    }

    /// Wait until every request sent before this call has been applied.
    pub async fn flush(&self) {
        let (reply, rx) = oneshot::channel();
        if self.send(Request::Flush { reply }) {
            let _ = rx.await;
        }
    }

    /// Stop the coordinator. In-flight vendor calls are left to finish and
    /// their results dropped.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && !self.requests.is_closed()
    }

    // ── Read model ───────────────────────────────────────────────────

    /// Latest published state.
    pub fn state(&self) -> Arc<SyncState> {
        self.state.borrow().clone()
    }

    /// Entry for `key` in the latest state. Never has side effects.
    pub fn read(&self, key: &MeasurementKey) -> MeasurementCacheEntry {
        self.state.borrow().measurement(key)
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<SyncState>> {
        self.state.clone()
    }

    pub fn stream(&self) -> StateStream {
        StateStream::new(self.state.clone())
    }
}

// ── Actor ────────────────────────────────────────────────────────────

struct SyncActor<T> {
    transport: Arc<T>,
    policy: SyncPolicy,
    auth: AuthSession,
    station: StationDataSync,
    /// The cache epoch doubles as the session epoch for every completion.
    cache: MeasurementCache,
    last_auth_error: Option<AuthError>,
    login_waiter: Option<AuthReply>,
    refresh_waiters: Vec<AuthReply>,
    station_waiters: Vec<StationReply>,
    parked: Vec<Parked>,
    state_tx: watch::Sender<Arc<SyncState>>,
    completions: mpsc::UnboundedSender<Completion>,
}

impl<T: VendorTransport> SyncActor<T> {
    async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<Request>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                Some(done) = completions.recv() => self.on_completion(done),
                request = requests.recv() => {
                    let Some(request) = request else { break };
                    self.on_request(request);
                }
            }
            self.publish();
        }

        self.cancel_waiters();
        debug!("sync coordinator stopped");
    }

    fn on_request(&mut self, request: Request) {
        match request {
            Request::Login {
                username,
                password,
                secret,
                reply,
            } => self.login(username, password, secret, reply),
            Request::Logout { reply } => {
                self.logout();
                let _ = reply.send(());
            }
            Request::Refresh { reply } => self.refresh(reply),
            Request::FetchStation { reply } => self.fetch_station(Some(reply)),
            Request::FetchMeasure { key } => self.fetch_measure(key),
            Request::Invalidate { key } => self.cache.invalidate(&key),
            Request::Flush { reply } => {
                let _ = reply.send(());
            }
        }
    }

    fn on_completion(&mut self, done: Completion) {
        match done {
            Completion::Login { epoch, result } => self.login_done(epoch, result),
            Completion::Refresh { epoch, result } => self.refresh_done(epoch, result),
            Completion::Station { epoch, result } => self.station_done(epoch, result),
            Completion::Measure { dispatch, result } => self.measure_done(dispatch, result),
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        epoch == self.cache.epoch()
    }

    // ── Auth ─────────────────────────────────────────────────────────

    fn restore(&mut self) {
        if let Some(token) = self.auth.begin_restore() {
            self.spawn_refresh(token);
        }
    }

    fn login(
        &mut self,
        username: String,
        password: SecretString,
        secret: SecretString,
        reply: AuthReply,
    ) {
        // A new attempt ends the current identity, whatever its outcome.
        if self.auth.status() == AuthStatus::Authenticated {
            info!("login replaces the current session");
            self.auth.sign_out(true);
            self.clear_data(None);
        }
        if let Err(e) = self.auth.begin_login(&username, &password, &secret) {
            if e != AuthError::AlreadyInProgress {
                self.last_auth_error = Some(e.clone());
            }
            let _ = reply.send(Err(e));
            return;
        }
        self.last_auth_error = None;
        self.login_waiter = Some(reply);

        let epoch = self.cache.epoch();
        let transport = Arc::clone(&self.transport);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = transport
                .authenticate(&username, &password, &secret)
                .await;
            let _ = completions.send(Completion::Login { epoch, result });
        });
    }

    fn login_done(&mut self, epoch: u64, result: Result<TokenPair, AuthError>) {
        if !self.is_current(epoch) {
            debug!("discarding login from previous session");
            return;
        }
        let result = self.auth.finish_login(result);
        match &result {
            Ok(_) => {
                self.last_auth_error = None;
                if self.policy.fetch_on_login {
                    self.fetch_station(None);
                }
            }
            Err(e) => {
                warn!(error = %e, "login failed");
                self.last_auth_error = Some(e.clone());
            }
        }
        if let Some(waiter) = self.login_waiter.take() {
            let _ = waiter.send(result);
        }
    }

    fn logout(&mut self) {
        info!("logging out");
        self.last_auth_error = None;
        self.reset(None, true);
    }

    fn refresh(&mut self, reply: AuthReply) {
        match self.auth.begin_refresh() {
            Ok(Some(token)) => {
                self.refresh_waiters.push(reply);
                self.spawn_refresh(token);
            }
            Ok(None) => {
                debug!("joining in-flight token refresh");
                self.refresh_waiters.push(reply);
            }
            Err(e) => {
                let _ = reply.send(Err(e));
            }
        }
    }

    /// Start a refresh for parked fetches unless one is already running.
    fn ensure_refresh(&mut self) {
        match self.auth.begin_refresh() {
            Ok(Some(token)) => self.spawn_refresh(token),
            Ok(None) => {}
            Err(e) => self.fail_parked(&FetchError::from(e)),
        }
    }

    fn spawn_refresh(&self, token: SecretString) {
        let epoch = self.cache.epoch();
        let transport = Arc::clone(&self.transport);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = transport.refresh_token(&token).await;
            let _ = completions.send(Completion::Refresh { epoch, result });
        });
    }

    fn refresh_done(&mut self, epoch: u64, result: Result<TokenPair, AuthError>) {
        if !self.is_current(epoch) {
            debug!("discarding token refresh from previous session");
            return;
        }
        let restoring = self.auth.is_restoring();
        let result = self.auth.finish_refresh(result);
        let waiters = std::mem::take(&mut self.refresh_waiters);

        match &result {
            Ok(_) => {
                self.last_auth_error = None;
                if restoring {
                    info!("session restored");
                    self.fetch_station(None);
                }
                self.dispatch_parked();
            }
            Err(AuthError::InvalidCredentials) => {
                warn!("refresh token rejected");
                self.last_auth_error = Some(AuthError::InvalidCredentials);
                self.revoke(FetchError::TokenRevoked);
            }
            Err(e) => {
                // Only `invalid_grant` ends the refresh token; it stays for later.
                warn!(error = %e, "token refresh failed");
                self.last_auth_error = Some(e.clone());
                let error = FetchError::from(e.clone());
                if restoring {
                    self.station.record_error(error.clone());
                }
                self.fail_parked(&error);
            }
        }

        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }

    // ── Station data ─────────────────────────────────────────────────

    fn fetch_station(&mut self, reply: Option<StationReply>) {
        let Some(token) = self.auth.access_token() else {
            if let Some(reply) = reply {
                let _ = reply.send(Err(FetchError::NotAuthenticated));
            }
            if self.auth.status() == AuthStatus::Authenticating {
                debug!("station fetch requested while signing in");
            } else {
                self.revoke(FetchError::NotAuthenticated);
            }
            return;
        };

        if let Some(reply) = reply {
            self.station_waiters.push(reply);
        }
        if !self.station.begin() {
            debug!("joining in-flight station fetch");
            return;
        }
        if self.auth.is_expired(Instant::now()) {
            debug!("access token expired, parking station fetch");
            self.parked.push(Parked::Station);
            self.ensure_refresh();
            return;
        }
        self.spawn_station_fetch(token);
    }

    fn spawn_station_fetch(&self, token: SecretString) {
        let epoch = self.cache.epoch();
        let transport = Arc::clone(&self.transport);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = transport.get_station_data(&token).await;
            let _ = completions.send(Completion::Station { epoch, result });
        });
    }

    fn station_done(&mut self, epoch: u64, result: Result<StationSnapshot, FetchError>) {
        if !self.is_current(epoch) {
            debug!("discarding station data from previous session");
            return;
        }
        let result = self.station.finish(result);
        let waiters = std::mem::take(&mut self.station_waiters);
        if let Err(e) = &result {
            self.on_fetch_error(e);
        }
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }

    // ── Measurements ─────────────────────────────────────────────────

    fn fetch_measure(&mut self, key: MeasurementKey) {
        if key.metrics().is_empty() {
            debug!(%key, "measurement requested without metrics");
            self.cache.record_failure(
                key,
                FetchError::VendorRejected {
                    code: api_code::INVALID_ARGUMENT,
                    message: "no metric requested".into(),
                },
            );
            return;
        }
        let Some(token) = self.auth.access_token() else {
            if self.auth.status() == AuthStatus::Authenticating {
                debug!(%key, "measurement requested while signing in");
                self.cache.record_failure(key, FetchError::NotAuthenticated);
            } else {
                self.revoke(FetchError::NotAuthenticated);
            }
            return;
        };

        let now = Instant::now();
        let Some(dispatch) = self.cache.begin_fetch(key, now) else {
            return;
        };
        if self.auth.is_expired(now) {
            debug!(key = %dispatch.key, "access token expired, parking measurement fetch");
            self.parked.push(Parked::Measure(dispatch));
            self.ensure_refresh();
            return;
        }
        self.spawn_measure_fetch(token, dispatch);
    }

    fn spawn_measure_fetch(&self, token: SecretString, dispatch: MeasureDispatch) {
        let transport = Arc::clone(&self.transport);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = transport.get_measurements(&token, &dispatch.key).await;
            let _ = completions.send(Completion::Measure { dispatch, result });
        });
    }

    fn measure_done(&mut self, dispatch: MeasureDispatch, result: Result<TimeSeries, FetchError>) {
        if !self.is_current(dispatch.epoch) {
            debug!(key = %dispatch.key, "discarding measurement from previous session");
            return;
        }
        if let Err(e) = &result {
            if e.is_session_fatal() {
                self.revoke(e.clone());
                return;
            }
            self.on_fetch_error(e);
        }
        self.cache.complete(&dispatch, result, Instant::now());
    }

    // ── Parked fetches ───────────────────────────────────────────────

    fn dispatch_parked(&mut self) {
        let Some(token) = self.auth.access_token() else {
            self.fail_parked(&FetchError::NotAuthenticated);
            return;
        };
        for parked in std::mem::take(&mut self.parked) {
            match parked {
                Parked::Station => self.spawn_station_fetch(token.clone()),
                Parked::Measure(dispatch) => self.spawn_measure_fetch(token.clone(), dispatch),
            }
        }
    }

    fn fail_parked(&mut self, error: &FetchError) {
        let now = Instant::now();
        for parked in std::mem::take(&mut self.parked) {
            match parked {
                Parked::Station => {
                    let result = self.station.finish(Err(error.clone()));
                    for waiter in self.station_waiters.drain(..) {
                        let _ = waiter.send(result.clone());
                    }
                }
                Parked::Measure(dispatch) => {
                    self.cache.complete(&dispatch, Err(error.clone()), now);
                }
            }
        }
    }

    // ── Error handling and resets ────────────────────────────────────

    fn on_fetch_error(&mut self, error: &FetchError) {
        match error {
            FetchError::TokenRevoked | FetchError::NotAuthenticated => self.revoke(error.clone()),
            FetchError::TokenExpired => {
                debug!("vendor reports access token expired");
                self.auth.mark_expired();
            }
            _ => {}
        }
    }

    /// Global reset: the current identity can no longer be trusted.
    fn revoke(&mut self, cause: FetchError) {
        warn!(error = %cause, "resetting session");
        let forget = cause != FetchError::NotAuthenticated;
        self.reset(Some(cause), forget);
    }

    /// Sign out and drop every piece of data tied to the session.
    fn reset(&mut self, cause: Option<FetchError>, forget: bool) {
        if let Some(waiter) = self.login_waiter.take() {
            let _ = waiter.send(Err(AuthError::Cancelled));
        }
        self.auth.sign_out(forget);
        self.clear_data(cause);
    }

    /// Start a new epoch with an empty snapshot and cache. Pending station
    /// callers receive `cause` (or `Cancelled`), refresh callers `Cancelled`.
    fn clear_data(&mut self, cause: Option<FetchError>) {
        self.cache.clear();
        self.station.clear(cause.clone());
        self.parked.clear();

        let station_error = cause.unwrap_or(FetchError::Cancelled);
        for waiter in self.station_waiters.drain(..) {
            let _ = waiter.send(Err(station_error.clone()));
        }
        for waiter in self.refresh_waiters.drain(..) {
            let _ = waiter.send(Err(AuthError::Cancelled));
        }
    }

    fn cancel_waiters(&mut self) {
        if let Some(waiter) = self.login_waiter.take() {
            let _ = waiter.send(Err(AuthError::Cancelled));
        }
        for waiter in self.refresh_waiters.drain(..) {
            let _ = waiter.send(Err(AuthError::Cancelled));
        }
        for waiter in self.station_waiters.drain(..) {
            let _ = waiter.send(Err(FetchError::Cancelled));
        }
    }

    // ── Publishing ───────────────────────────────────────────────────

    fn publish(&self) {
        let next = SyncState {
            auth: self.auth.status(),
            last_auth_error: self.last_auth_error.clone(),
            station: self.station.snapshot().cloned(),
            loading_station_data: self.station.is_loading(),
            station_data_errors: self.station.last_error().cloned(),
            measurements: Arc::new(self.cache.snapshot()),
        };
        self.state_tx.send_if_modified(|current| {
            if **current == next {
                return false;
            }
            *current = Arc::new(next);
            true
        });
    }
}
