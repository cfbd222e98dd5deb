//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use streamserver::credentials::{ClientCredentials, Credential, Token};
use streamserver::gateway::{GatewayError, GatewayResult, UpstreamGateway};
use streamserver::monitor::{FollowSet, FollowedChannel, Provider, StatusListener, StreamRecord};
use streamserver::scheduler::MonitorState;

/// Scripted answer of a stub call.
#[derive(Debug, Clone)]
pub enum Reply<T> {
    Ok(T),
    Unauthorized,
    Timeout,
    Unavailable,
    Fatal,
}

impl<T: Clone> Reply<T> {
    fn to_result(&self) -> GatewayResult<T> {
        match self {
            Reply::Ok(value) => Ok(value.clone()),
            Reply::Unauthorized => Err(GatewayError::Unauthorized),
            Reply::Timeout => Err(GatewayError::DeadlineExceeded),
            Reply::Unavailable => Err(GatewayError::Unavailable("maintenance".into())),
            Reply::Fatal => Err(GatewayError::Status {
                status: 500,
                body: "boom".into(),
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct CallCounts {
    pub app_token: AtomicUsize,
    pub user_refresh: AtomicUsize,
    pub exchange: AtomicUsize,
    pub user_id: AtomicUsize,
    pub follows: AtomicUsize,
    pub primary: AtomicUsize,
    pub secondary: AtomicUsize,
}

/// Deterministic [`UpstreamGateway`] with scripted replies and call counters.
pub struct StubGateway {
    pub app_token: Mutex<Reply<Token>>,
    pub user_refresh: Mutex<Reply<Token>>,
    pub exchange: Mutex<Reply<Token>>,
    pub follows: Mutex<Reply<FollowSet>>,
    pub primary: Mutex<Reply<Vec<StreamRecord>>>,
    pub secondary: Mutex<Reply<Vec<StreamRecord>>>,
    /// App tokens presented to the primary listing, in call order.
    pub primary_tokens: Mutex<Vec<String>>,
    pub calls: CallCounts,
    /// Signalled whenever a primary fetch starts.
    pub primary_entered: Notify,
    primary_gate: Mutex<Option<Arc<Notify>>>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self {
            app_token: Mutex::new(Reply::Ok(fresh_token("app"))),
            user_refresh: Mutex::new(Reply::Ok(fresh_token("user-refreshed"))),
            exchange: Mutex::new(Reply::Ok(fresh_token("user-exchanged"))),
            follows: Mutex::new(Reply::Ok(follow_set(&["alice", "bob"]))),
            primary: Mutex::new(Reply::Ok(Vec::new())),
            secondary: Mutex::new(Reply::Ok(Vec::new())),
            primary_tokens: Mutex::new(Vec::new()),
            calls: CallCounts::default(),
            primary_entered: Notify::new(),
            primary_gate: Mutex::new(None),
        }
    }

    pub fn set_primary(&self, reply: Reply<Vec<StreamRecord>>) {
        *self.primary.lock().unwrap() = reply;
    }

    pub fn set_secondary(&self, reply: Reply<Vec<StreamRecord>>) {
        *self.secondary.lock().unwrap() = reply;
    }

    pub fn set_app_token(&self, reply: Reply<Token>) {
        *self.app_token.lock().unwrap() = reply;
    }

    pub fn set_user_refresh(&self, reply: Reply<Token>) {
        *self.user_refresh.lock().unwrap() = reply;
    }

    pub fn set_follows(&self, reply: Reply<FollowSet>) {
        *self.follows.lock().unwrap() = reply;
    }

    /// Make every primary fetch wait for a `notify_one` on the returned gate.
    pub fn block_primary(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.primary_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn primary_calls(&self) -> usize {
        Self::count(&self.calls.primary)
    }
}

impl Default for StubGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpstreamGateway for StubGateway {
    async fn fetch_app_token(&self, _client: &ClientCredentials) -> GatewayResult<Token> {
        self.calls.app_token.fetch_add(1, Ordering::SeqCst);
        self.app_token.lock().unwrap().to_result()
    }

    async fn refresh_user_token(
        &self,
        _client: &ClientCredentials,
        _current: &Token,
    ) -> GatewayResult<Token> {
        self.calls.user_refresh.fetch_add(1, Ordering::SeqCst);
        self.user_refresh.lock().unwrap().to_result()
    }

    async fn exchange_auth_code(
        &self,
        _client: &ClientCredentials,
        _code: &str,
        _redirect_uri: &str,
    ) -> GatewayResult<Token> {
        self.calls.exchange.fetch_add(1, Ordering::SeqCst);
        self.exchange.lock().unwrap().to_result()
    }

    async fn fetch_user_id(
        &self,
        _app_token: &Token,
        _client_id: &str,
        login: &str,
    ) -> GatewayResult<String> {
        self.calls.user_id.fetch_add(1, Ordering::SeqCst);
        Ok(format!("id-{}", login))
    }

    async fn fetch_follow_list(
        &self,
        _user_token: &Token,
        _client_id: &str,
        _user_id: &str,
    ) -> GatewayResult<FollowSet> {
        self.calls.follows.fetch_add(1, Ordering::SeqCst);
        self.follows.lock().unwrap().to_result()
    }

    async fn fetch_primary_live(
        &self,
        app_token: &Token,
        _client_id: &str,
        _follows: &FollowSet,
    ) -> GatewayResult<Vec<StreamRecord>> {
        self.calls.primary.fetch_add(1, Ordering::SeqCst);
        self.primary_tokens
            .lock()
            .unwrap()
            .push(app_token.access_token.clone());
        self.primary_entered.notify_one();

        let gate = self.primary_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.primary.lock().unwrap().to_result()
    }

    async fn fetch_secondary_live(&self) -> GatewayResult<Vec<StreamRecord>> {
        self.calls.secondary.fetch_add(1, Ordering::SeqCst);
        self.secondary.lock().unwrap().to_result()
    }
}

/// Live/offline callbacks in the order received.
#[derive(Default)]
pub struct RecordingListener {
    pub live: Mutex<Vec<StreamRecord>>,
    pub offline: Mutex<Vec<StreamRecord>>,
}

impl RecordingListener {
    pub fn live_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .live
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn offline_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .offline
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn total(&self) -> usize {
        self.live.lock().unwrap().len() + self.offline.lock().unwrap().len()
    }
}

impl StatusListener for RecordingListener {
    fn on_live(&self, record: &StreamRecord) {
        self.live.lock().unwrap().push(record.clone());
    }

    fn on_offline(&self, record: &StreamRecord) {
        self.offline.lock().unwrap().push(record.clone());
    }
}

pub fn fresh_token(value: &str) -> Token {
    Token::new(value, Utc::now() + chrono::Duration::hours(4))
        .with_refresh_token(Some(format!("{}-refresh", value)))
}

pub fn expired_token(value: &str) -> Token {
    Token::new(value, Utc::now() - chrono::Duration::minutes(5))
        .with_refresh_token(Some(format!("{}-refresh", value)))
}

pub fn twitch(identity: &str) -> StreamRecord {
    StreamRecord::new(Provider::Twitch, identity)
}

pub fn strims(identity: &str) -> StreamRecord {
    StreamRecord::new(Provider::Strims, identity)
}

pub fn follow_set(logins: &[&str]) -> FollowSet {
    FollowSet::new(
        logins
            .iter()
            .enumerate()
            .map(|(i, login)| FollowedChannel {
                id: (i + 1).to_string(),
                login: login.to_string(),
                display_name: login.to_string(),
            })
            .collect(),
    )
}

pub fn credential() -> Credential {
    Credential::new(ClientCredentials::new("client-id", "client-secret"), "viewer")
}

/// State with an app token, a user token and a resolved user id.
pub fn authorized_state() -> MonitorState {
    let mut credential = credential();
    credential.user_id = Some("id-viewer".into());
    credential.app_token = Some(fresh_token("app"));
    credential.user_token = Some(fresh_token("user"));
    MonitorState::new(credential)
}

/// State without a user token.
pub fn unauthorized_state() -> MonitorState {
    let mut state = authorized_state();
    state.credential.user_token = None;
    state
}
