/*
[INPUT]:  Token store, auth transport, wallet signer, clock
[OUTPUT]: Valid access tokens, transparently refreshed or re-obtained
[POS]:    Auth layer - orchestrates the token lifecycle (login, refresh, expiry, single-flight)
[UPDATE]: When login/refresh flow, fallback rules or persistence policy change
*/

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};

use chrono::Duration;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::http::{AuthFailure, PrecogError, Result};

use super::{
    AuthTransport, Clock, PersistedSession, SessionState, SystemClock, TokenStore, WalletSigner,
};

/// Default lead time before expiry at which a token counts as stale
pub const DEFAULT_SAFETY_MARGIN_SECS: i64 = 30;

type Renewal = Shared<BoxFuture<'static, Result<PersistedSession>>>;

/// What an in-flight renewal was started for
#[derive(Debug, Clone, PartialEq, Eq)]
enum RenewalKind {
    /// Any usable session: reuse, refresh, or log in
    Renew,
    /// Like `Renew`, but the given access token must not come back
    Replace(String),
    /// Explicit refresh of the stored session
    Refresh,
    /// Explicit wallet login
    Login,
}

impl RenewalKind {
    /// A caller wanting `self` can take the outcome of a pending `other`
    fn accepts(&self, other: &RenewalKind) -> bool {
        match (self, other) {
            (wanted, pending) if wanted == pending => true,
            (RenewalKind::Renew, RenewalKind::Replace(_) | RenewalKind::Login) => true,
            (RenewalKind::Replace(_), RenewalKind::Login) => true,
            _ => false,
        }
    }
}

struct InFlight {
    kind: RenewalKind,
    renewal: Renewal,
}

/// Builder for [`TokenManager`]
pub struct TokenManagerBuilder {
    store: Arc<dyn TokenStore>,
    transport: Arc<dyn AuthTransport>,
    wallet: Arc<dyn WalletSigner>,
    clock: Arc<dyn Clock>,
    safety_margin: Duration,
}

impl TokenManagerBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    pub fn build(self) -> TokenManager {
        TokenManager {
            inner: Arc::new(Inner {
                store: self.store,
                transport: self.transport,
                wallet: self.wallet,
                clock: self.clock,
                safety_margin: self.safety_margin,
                cached: RwLock::new(None),
                in_flight: Mutex::new(None),
            }),
        }
    }
}

/// Hands out valid access tokens for one wallet.
///
/// There is no background refresh: every renewal happens lazily inside
/// [`TokenManager::ensure_valid_access_token`]. Concurrent callers that find
/// the token stale share a single in-flight login or refresh.
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn TokenStore>,
    transport: Arc<dyn AuthTransport>,
    wallet: Arc<dyn WalletSigner>,
    clock: Arc<dyn Clock>,
    safety_margin: Duration,
    cached: RwLock<Option<PersistedSession>>,
    in_flight: Mutex<Option<InFlight>>,
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("wallet", &self.inner.wallet.address())
            .field("safety_margin_secs", &self.inner.safety_margin.num_seconds())
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Create a manager with the system clock and the default safety margin
    pub fn new(
        store: Arc<dyn TokenStore>,
        transport: Arc<dyn AuthTransport>,
        wallet: Arc<dyn WalletSigner>,
    ) -> Self {
        Self::builder(store, transport, wallet).build()
    }

    pub fn builder(
        store: Arc<dyn TokenStore>,
        transport: Arc<dyn AuthTransport>,
        wallet: Arc<dyn WalletSigner>,
    ) -> TokenManagerBuilder {
        TokenManagerBuilder {
            store,
            transport,
            wallet,
            clock: Arc::new(SystemClock),
            safety_margin: Duration::seconds(DEFAULT_SAFETY_MARGIN_SECS),
        }
    }

    pub fn wallet_address(&self) -> &str {
        self.inner.wallet.address()
    }

    pub fn safety_margin(&self) -> Duration {
        self.inner.safety_margin
    }

    /// Return an access token valid for at least the safety margin.
    ///
    /// Logs in when no session exists, refreshes a stale access token, and
    /// falls back to a fresh login when the refresh token is dead.
    pub async fn ensure_valid_access_token(&self) -> Result<String> {
        let now = self.inner.clock.now();
        if let Some(token) = self.inner.cached_valid_token(now) {
            debug!("using cached access token");
            return Ok(token);
        }

        if let Some(session) = self.inner.load().await? {
            if session.tokens.access_valid(now, self.inner.safety_margin) {
                let token = session.tokens.access_token.clone();
                self.inner.remember(session);
                return Ok(token);
            }
        }

        let session = self.single_flight(RenewalKind::Renew).await?;
        self.inner.checked_token(session)
    }

    /// The server refused `token` (HTTP 401) although it looked valid; obtain another.
    ///
    /// If the stored session already carries a different token, that one is returned
    /// without a network call.
    pub async fn renew_rejected_token(&self, token: &str) -> Result<String> {
        self.inner.forget_if(token);
        let session = self
            .single_flight(RenewalKind::Replace(token.to_string()))
            .await?;
        self.inner.checked_token(session)
    }

    /// Full wallet login, replacing any stored session.
    ///
    /// Concurrent logins share one network round trip; a pending refresh is
    /// awaited first.
    pub async fn login(&self) -> Result<PersistedSession> {
        self.single_flight(RenewalKind::Login).await
    }

    /// Exchange the stored refresh token for a new pair.
    ///
    /// Fails with `RefreshTokenExpired` without touching the network when there is
    /// no session or its refresh token is past expiry.
    pub async fn refresh(&self) -> Result<PersistedSession> {
        self.single_flight(RenewalKind::Refresh).await
    }

    /// Currently persisted session for this wallet, if any
    pub async fn session(&self) -> Result<Option<PersistedSession>> {
        self.inner.load().await
    }

    /// Lifecycle state of the persisted session right now
    pub async fn session_state(&self) -> Result<SessionState> {
        let session = self.inner.load().await?;
        let now = self.inner.clock.now();
        Ok(super::session_state(
            session.as_ref(),
            now,
            self.inner.safety_margin,
        ))
    }

    /// Drop the persisted session; the next token request logs in again
    pub async fn logout(&self) -> Result<()> {
        self.inner.discard().await
    }

    /// Run `kind` so that at most one login or refresh is in flight.
    ///
    /// Joins a pending renewal whose outcome serves `kind`; otherwise waits for
    /// the pending one to settle and starts its own.
    async fn single_flight(&self, kind: RenewalKind) -> Result<PersistedSession> {
        loop {
            let (renewal, usable) = {
                let mut slot = self.inner.in_flight.lock().await;
                match slot.as_ref() {
                    Some(pending) if pending.renewal.peek().is_none() => {
                        let usable = kind.accepts(&pending.kind);
                        debug!(
                            ?kind,
                            pending = ?pending.kind,
                            usable,
                            "token renewal already in flight"
                        );
                        (pending.renewal.clone(), usable)
                    }
                    _ => {
                        let renewal = self.start(kind.clone());
                        *slot = Some(InFlight {
                            kind: kind.clone(),
                            renewal: renewal.clone(),
                        });
                        (renewal, true)
                    }
                }
            };

            let result = renewal.clone().await;
            self.release(&renewal).await;
            if usable {
                return result;
            }
        }
    }

    fn start(&self, kind: RenewalKind) -> Renewal {
        let inner = Arc::clone(&self.inner);
        let work = async move {
            match kind {
                RenewalKind::Renew => inner.renew_once(None).await,
                RenewalKind::Replace(rejected) => inner.renew_once(Some(rejected)).await,
                RenewalKind::Refresh => inner.refresh_stored().await,
                RenewalKind::Login => inner.login().await,
            }
        };

        // A panic must settle the shared future, or every later caller would join it
        AssertUnwindSafe(work)
            .catch_unwind()
            .map(|outcome| {
                outcome.unwrap_or_else(|_| {
                    error!("token renewal panicked");
                    Err(PrecogError::Internal("token renewal panicked".to_string()))
                })
            })
            .boxed()
            .shared()
    }

    async fn release(&self, renewal: &Renewal) {
        let mut slot = self.inner.in_flight.lock().await;
        if slot
            .as_ref()
            .is_some_and(|pending| pending.renewal.ptr_eq(renewal))
        {
            *slot = None;
        }
    }
}

impl Inner {
    fn cached_valid_token(&self, now: chrono::DateTime<chrono::Utc>) -> Option<String> {
        let guard = self.cached.read().ok()?;
        guard
            .as_ref()
            .filter(|s| s.tokens.access_valid(now, self.safety_margin))
            .map(|s| s.tokens.access_token.clone())
    }

    fn remember(&self, session: PersistedSession) {
        if let Ok(mut guard) = self.cached.write() {
            *guard = Some(session);
        }
    }

    fn forget(&self) {
        if let Ok(mut guard) = self.cached.write() {
            *guard = None;
        }
    }

    fn forget_if(&self, token: &str) {
        if let Ok(mut guard) = self.cached.write() {
            if guard.as_ref().is_some_and(|s| s.tokens.access_token == token) {
                *guard = None;
            }
        }
    }

    fn checked_token(&self, session: PersistedSession) -> Result<String> {
        let now = self.clock.now();
        if session.tokens.access_valid(now, self.safety_margin) {
            Ok(session.tokens.access_token)
        } else {
            Err(PrecogError::InvalidResponse(format!(
                "server issued an access token expiring at {}, inside the {}s safety margin",
                session.tokens.access_expires_at,
                self.safety_margin.num_seconds()
            )))
        }
    }

    /// Load from the store; sessions of another wallet count as absent
    async fn load(&self) -> Result<Option<PersistedSession>> {
        let session = match self.store.load().await {
            Ok(session) => session,
            Err(err) => {
                self.forget();
                return Err(err);
            }
        };

        match session {
            Some(session) if !session.belongs_to(self.wallet.address()) => {
                debug!(
                    stored_wallet = %session.wallet_identity,
                    wallet = %self.wallet.address(),
                    "stored session belongs to another wallet, ignoring"
                );
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn persist(&self, session: &PersistedSession) -> Result<()> {
        if let Err(err) = self.store.save(session).await {
            self.forget();
            return Err(err);
        }
        self.remember(session.clone());
        Ok(())
    }

    async fn discard(&self) -> Result<()> {
        self.forget();
        self.store.clear().await
    }

    /// Clear the session only while the store still holds `refresh_token`
    async fn discard_if_current(&self, refresh_token: &str) -> Result<()> {
        match self.store.load().await? {
            Some(current) if current.tokens.refresh_token != refresh_token => {
                debug!("stored session was replaced meanwhile, keeping it");
                Ok(())
            }
            _ => self.discard().await,
        }
    }

    async fn renew_once(&self, rejected: Option<String>) -> Result<PersistedSession> {
        if let Some(session) = self.load().await? {
            let now = self.clock.now();
            let was_rejected = rejected.as_deref() == Some(session.access_token());

            if session.state(now, self.safety_margin) == SessionState::Active && !was_rejected {
                debug!("session already renewed, skipping network call");
                self.remember(session.clone());
                return Ok(session);
            }

            match self.refresh(&session).await {
                Ok(session) => return Ok(session),
                Err(PrecogError::RefreshTokenExpired { message }) => {
                    info!(
                        wallet = %session.wallet_identity,
                        reason = %message,
                        "refresh not possible, logging in again"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        self.login().await
    }

    async fn refresh_stored(&self) -> Result<PersistedSession> {
        match self.load().await? {
            Some(session) => self.refresh(&session).await,
            None => Err(PrecogError::refresh_expired("no stored session to refresh")),
        }
    }

    async fn refresh(&self, session: &PersistedSession) -> Result<PersistedSession> {
        let now = self.clock.now();
        if !session.tokens.refresh_usable(now) {
            self.discard_if_current(&session.tokens.refresh_token).await?;
            return Err(PrecogError::refresh_expired(format!(
                "refresh token expired at {}",
                session.tokens.refresh_expires_at
            )));
        }

        let grant = match self
            .transport
            .submit_refresh(&session.tokens.refresh_token)
            .await
        {
            Ok(grant) => grant,
            Err(err @ PrecogError::RefreshTokenExpired { .. }) => {
                warn!(wallet = %session.wallet_identity, error = %err, "refresh token rejected");
                self.discard_if_current(&session.tokens.refresh_token).await?;
                return Err(err);
            }
            Err(err) => {
                warn!(wallet = %session.wallet_identity, error = %err, "token refresh failed");
                return Err(err);
            }
        };

        let now = self.clock.now();
        let refreshed =
            PersistedSession::new(session.wallet_identity.clone(), grant.into_pair(now)?, now);
        self.persist(&refreshed).await?;

        info!(
            wallet = %refreshed.wallet_identity,
            access_expires_at = %refreshed.tokens.access_expires_at,
            refresh_expires_at = %refreshed.tokens.refresh_expires_at,
            "access token refreshed"
        );
        Ok(refreshed)
    }

    async fn login(&self) -> Result<PersistedSession> {
        let address = self.wallet.address().to_string();
        info!(wallet = %address, "logging in with wallet signature");

        let challenge = match self.transport.request_challenge(&address).await {
            Ok(challenge) => challenge,
            Err(err) => return Err(self.login_failed(err).await),
        };

        let signature = match self.wallet.sign(challenge.challenge_text.as_bytes()).await {
            Ok(signature) => signature,
            Err(err) => return Err(self.login_failed(wallet_error(err)).await),
        };

        let grant = match self
            .transport
            .submit_login(challenge, &address, &signature)
            .await
        {
            Ok(grant) => grant,
            Err(err) => return Err(self.login_failed(err).await),
        };

        let now = self.clock.now();
        let session = PersistedSession::new(address, grant.into_pair(now)?, now);
        self.persist(&session).await?;

        info!(
            wallet = %session.wallet_identity,
            access_expires_at = %session.tokens.access_expires_at,
            refresh_expires_at = %session.tokens.refresh_expires_at,
            "login successful"
        );
        Ok(session)
    }

    /// Rejected logins clear the session; transport failures leave it for a later retry
    async fn login_failed(&self, err: PrecogError) -> PrecogError {
        warn!(wallet = %self.wallet.address(), error = %err, "login failed");
        if err.requires_reauthentication() {
            if let Err(clear_err) = self.discard().await {
                warn!(error = %clear_err, "failed to clear rejected session");
            }
        }
        err
    }
}

fn wallet_error(err: PrecogError) -> PrecogError {
    match err {
        err @ PrecogError::AuthenticationRequired { .. } => err,
        other => PrecogError::authentication(AuthFailure::WalletUnavailable, other.to_string()),
    }
}
