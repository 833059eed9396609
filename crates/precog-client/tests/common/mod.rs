/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for precog-client tests

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use precog_client::{
    AuthChallenge, AuthTransport, MemoryTokenStore, PersistedSession, PrecogError, Result,
    TokenGrant, TokenPair, TokenStore,
};
use uuid::Uuid;
use wiremock::MockServer;

pub const WALLET: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Fixed epoch used as T=0 in timeline tests
pub fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_790_000_000, 0).unwrap()
}

pub fn at(secs: i64) -> DateTime<Utc> {
    t0() + chrono::Duration::seconds(secs)
}

pub fn temp_dir() -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("precog-test-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&path).unwrap();
    path
}

/// Session issued at T=0 with the given absolute expiries (seconds after T=0)
pub fn session_expiring(access_at: i64, refresh_at: i64) -> PersistedSession {
    PersistedSession::new(
        WALLET,
        TokenPair {
            access_token: "access-seed".to_string(),
            access_expires_at: at(access_at),
            refresh_token: "refresh-seed".to_string(),
            refresh_expires_at: at(refresh_at),
        },
        t0(),
    )
}

/// Scripted auth transport that counts calls and issues numbered tokens
pub struct MockAuthTransport {
    login_lifetimes: Mutex<(u64, Option<u64>)>,
    refresh_lifetimes: Mutex<(u64, Option<u64>)>,
    delay: Duration,
    challenge_failures: Mutex<VecDeque<PrecogError>>,
    login_failures: Mutex<VecDeque<PrecogError>>,
    refresh_failures: Mutex<VecDeque<PrecogError>>,
    challenge_calls: AtomicUsize,
    login_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    submitted_challenges: Mutex<Vec<String>>,
    refresh_tokens_seen: Mutex<Vec<String>>,
    strict_rotation: bool,
    consumed_refresh_tokens: Mutex<HashSet<String>>,
    panic_next_login: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Marks one network call as running until dropped
struct CallGuard<'a> {
    in_flight: &'a AtomicUsize,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockAuthTransport {
    pub fn new(access_lifetime: u64, refresh_lifetime: u64) -> Self {
        Self {
            login_lifetimes: Mutex::new((access_lifetime, Some(refresh_lifetime))),
            refresh_lifetimes: Mutex::new((access_lifetime, Some(refresh_lifetime))),
            delay: Duration::ZERO,
            challenge_failures: Mutex::new(VecDeque::new()),
            login_failures: Mutex::new(VecDeque::new()),
            refresh_failures: Mutex::new(VecDeque::new()),
            challenge_calls: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            submitted_challenges: Mutex::new(Vec::new()),
            refresh_tokens_seen: Mutex::new(Vec::new()),
            strict_rotation: false,
            consumed_refresh_tokens: Mutex::new(HashSet::new()),
            panic_next_login: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Each refresh token works once; reusing one is rejected like a revoked token
    pub fn strict_rotation(mut self) -> Self {
        self.strict_rotation = true;
        self
    }

    /// The next login call panics instead of answering
    pub fn panic_next_login(&self) {
        self.panic_next_login.store(true, Ordering::SeqCst);
    }

    /// Highest number of network calls that were running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Every network call sleeps this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_refresh_lifetimes(&self, access: u64, refresh: Option<u64>) {
        *self.refresh_lifetimes.lock().unwrap() = (access, refresh);
    }

    pub fn set_login_lifetimes(&self, access: u64, refresh: Option<u64>) {
        *self.login_lifetimes.lock().unwrap() = (access, refresh);
    }

    pub fn fail_next_challenge(&self, err: PrecogError) {
        self.challenge_failures.lock().unwrap().push_back(err);
    }

    pub fn fail_next_login(&self, err: PrecogError) {
        self.login_failures.lock().unwrap().push_back(err);
    }

    pub fn fail_next_refresh(&self, err: PrecogError) {
        self.refresh_failures.lock().unwrap().push_back(err);
    }

    pub fn challenges(&self) -> usize {
        self.challenge_calls.load(Ordering::SeqCst)
    }

    pub fn logins(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn network_calls(&self) -> usize {
        self.challenges() + self.logins() + self.refreshes()
    }

    pub fn submitted_challenges(&self) -> Vec<String> {
        self.submitted_challenges.lock().unwrap().clone()
    }

    pub fn refresh_tokens_seen(&self) -> Vec<String> {
        self.refresh_tokens_seen.lock().unwrap().clone()
    }

    fn enter(&self) -> CallGuard<'_> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        CallGuard {
            in_flight: &self.in_flight,
        }
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl AuthTransport for MockAuthTransport {
    async fn request_challenge(&self, address: &str) -> Result<AuthChallenge> {
        let n = self.challenge_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let _call = self.enter();
        self.pause().await;
        if let Some(err) = self.challenge_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(AuthChallenge {
            challenge_id: format!("challenge-{n}"),
            challenge_text: format!("sign this for {address} #{n}"),
        })
    }

    async fn submit_login(
        &self,
        challenge: AuthChallenge,
        _address: &str,
        _signature: &[u8],
    ) -> Result<TokenGrant> {
        let n = self.login_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let _call = self.enter();
        if self.panic_next_login.swap(false, Ordering::SeqCst) {
            panic!("login handler crashed");
        }
        self.submitted_challenges
            .lock()
            .unwrap()
            .push(challenge.challenge_id);
        self.pause().await;
        if let Some(err) = self.login_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        let (expires_in, refresh_expires_in) = *self.login_lifetimes.lock().unwrap();
        Ok(TokenGrant {
            access_token: format!("access-login-{n}"),
            refresh_token: format!("refresh-login-{n}"),
            expires_in,
            refresh_expires_in,
        })
    }

    async fn submit_refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let _call = self.enter();
        self.refresh_tokens_seen
            .lock()
            .unwrap()
            .push(refresh_token.to_string());
        let reused = self.strict_rotation
            && !self
                .consumed_refresh_tokens
                .lock()
                .unwrap()
                .insert(refresh_token.to_string());
        self.pause().await;
        if reused {
            return Err(PrecogError::refresh_expired("refresh token already consumed"));
        }
        if let Some(err) = self.refresh_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        let (expires_in, refresh_expires_in) = *self.refresh_lifetimes.lock().unwrap();
        Ok(TokenGrant {
            access_token: format!("access-refresh-{n}"),
            refresh_token: format!("refresh-refresh-{n}"),
            expires_in,
            refresh_expires_in,
        })
    }
}

/// Memory store whose writes can be made to fail
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryTokenStore,
    fail_saves: AtomicBool,
    pub saves: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TokenStore for FlakyStore {
    async fn load(&self) -> Result<Option<PersistedSession>> {
        self.inner.load().await
    }

    async fn save(&self, session: &PersistedSession) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PrecogError::storage("disk full"));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(session).await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }
}
