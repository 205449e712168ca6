use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::json;
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::sync::Mutex;

use crate::{
    access::{Page, Session},
    config::AppConfig,
    error::SessionError,
    models::{BusinessRole, User},
};

// 1. SessionProvider Contract
/// SessionProvider
///
/// The contract for the hosted authentication backend. The access gate only ever reads the
/// current user; `update_role` is used by the role-selection flow, and its effect is observed
/// by the gate through a later `current_user` call.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Returns the user behind `token`, or `NoSession` if the backend rejects it.
    async fn current_user(&self, token: &str) -> Result<User, SessionError>;

    /// URL of the external login flow. After login the backend sends the user back to
    /// `return_to` (or to the front end's root when `None`).
    fn login_url(&self, return_to: Option<&Page>) -> String;

    /// Ends the session behind `token`.
    async fn logout(&self, token: &str) -> Result<(), SessionError>;

    /// Writes the business role of the user behind `token` and returns the updated record.
    async fn update_role(&self, token: &str, role: BusinessRole) -> Result<User, SessionError>;
}

/// SessionProviderState
///
/// The shared handle to the session backend held in the application state.
pub type SessionProviderState = Arc<dyn SessionProvider>;

// 2. The Real Implementation (hosted backend)
/// HostedSessionProvider
///
/// Talks to the hosted backend's REST API. Every call is scoped to one application id and
/// authenticated with the caller's bearer token.
#[derive(Clone)]
pub struct HostedSessionProvider {
    client: reqwest::Client,
    base_url: String,
    app_id: String,
    app_url: String,
}

impl HostedSessionProvider {
    pub fn new(base_url: &str, app_id: &str, app_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            app_id: app_id.to_string(),
            app_url: app_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.baas_url, &config.baas_app_id, &config.app_url)
    }

    fn me_url(&self) -> String {
        format!(
            "{}/api/apps/{}/entities/User/me",
            self.base_url, self.app_id
        )
    }

    fn logout_url(&self) -> String {
        format!("{}/api/apps/{}/auth/logout", self.base_url, self.app_id)
    }

    /// Reads a `User` body from a backend response, classifying failure statuses.
    async fn read_user(response: reqwest::Response) -> Result<User, SessionError> {
        check_status(response.status())?;
        response
            .json::<User>()
            .await
            .map_err(|e| SessionError::Rejected(format!("malformed user record: {}", e)))
    }
}

/// check_status
///
/// 401/403 mean the session is gone; 5xx is transient; any other non-success is a rejection.
fn check_status(status: StatusCode) -> Result<(), SessionError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SessionError::NoSession);
    }
    if status.is_server_error() {
        return Err(SessionError::Transient(status.to_string()));
    }
    if !status.is_success() {
        return Err(SessionError::Rejected(status.to_string()));
    }
    Ok(())
}

fn transport_error(e: reqwest::Error) -> SessionError {
    if e.is_timeout() {
        SessionError::Timeout
    } else {
        SessionError::Transient(e.to_string())
    }
}

#[async_trait]
impl SessionProvider for HostedSessionProvider {
    async fn current_user(&self, token: &str) -> Result<User, SessionError> {
        let response = self
            .client
            .get(self.me_url())
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;
        Self::read_user(response).await
    }

    fn login_url(&self, return_to: Option<&Page>) -> String {
        let from_url = match return_to {
            Some(page) => format!("{}{}", self.app_url, page.location()),
            None => self.app_url.clone(),
        };
        let login = format!("{}/login", self.base_url);
        match Url::parse_with_params(&login, &[("from_url", from_url.as_str())]) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::warn!("invalid login url {}: {}", login, e);
                login
            }
        }
    }

    async fn logout(&self, token: &str) -> Result<(), SessionError> {
        let response = self
            .client
            .post(self.logout_url())
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response.status())
    }

    async fn update_role(&self, token: &str, role: BusinessRole) -> Result<User, SessionError> {
        let response = self
            .client
            .put(self.me_url())
            .bearer_auth(token)
            .json(&json!({ "user_role": role.as_str() }))
            .send()
            .await
            .map_err(transport_error)?;
        Self::read_user(response).await
    }
}

// 3. The Mock Implementation (tests and local development)
/// MockSessionProvider
///
/// In-memory provider keyed by token. Failures queued with `failing_with` are returned, in
/// order, before any lookup succeeds; per-token delays simulate slow backend responses.
#[derive(Default)]
pub struct MockSessionProvider {
    users: Mutex<HashMap<String, User>>,
    failures: Mutex<VecDeque<SessionError>>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
}

impl MockSessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, token: &str, user: User) -> Self {
        self.users.get_mut().insert(token.to_string(), user);
        self
    }

    pub fn with_delay(mut self, token: &str, delay: Duration) -> Self {
        self.delays.insert(token.to_string(), delay);
        self
    }

    pub fn failing_with(mut self, error: SessionError) -> Self {
        self.failures.get_mut().push_back(error);
        self
    }

    /// Number of `current_user` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for MockSessionProvider {
    async fn current_user(&self, token: &str) -> Result<User, SessionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(token) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(error) = self.failures.lock().await.pop_front() {
            return Err(error);
        }
        self.users
            .lock()
            .await
            .get(token)
            .cloned()
            .ok_or(SessionError::NoSession)
    }

    fn login_url(&self, return_to: Option<&Page>) -> String {
        match return_to {
            Some(page) => format!("http://localhost:4000/login?from_url={}", page.location()),
            None => "http://localhost:4000/login".to_string(),
        }
    }

    async fn logout(&self, token: &str) -> Result<(), SessionError> {
        self.users
            .lock()
            .await
            .remove(token)
            .map(|_| ())
            .ok_or(SessionError::NoSession)
    }

    async fn update_role(&self, token: &str, role: BusinessRole) -> Result<User, SessionError> {
        let mut users = self.users.lock().await;
        let user = users.get_mut(token).ok_or(SessionError::NoSession)?;
        user.user_role = Some(role.as_str().to_string());
        Ok(user.clone())
    }
}

// 4. Session Resolution
/// SessionContext
///
/// The injected session dependency of the access gate. It bounds every fetch with a timeout
/// and retries transient failures a fixed number of times; whatever still fails becomes
/// `Session::Failed`, which the gate turns into a login redirect.
#[derive(Clone)]
pub struct SessionContext {
    provider: SessionProviderState,
    timeout: Duration,
    retries: u32,
}

impl SessionContext {
    pub fn new(provider: SessionProviderState, timeout: Duration, retries: u32) -> Self {
        Self {
            provider,
            timeout,
            retries,
        }
    }

    pub fn from_config(provider: SessionProviderState, config: &AppConfig) -> Self {
        Self::new(provider, config.session_timeout, config.session_retries)
    }

    pub fn provider(&self) -> &SessionProviderState {
        &self.provider
    }

    /// fetch_user
    ///
    /// One logical session fetch: up to `1 + retries` attempts, each bounded by the timeout.
    /// `NoSession` and `Rejected` are returned immediately.
    pub async fn fetch_user(&self, token: &str) -> Result<User, SessionError> {
        let mut attempt = 0;
        loop {
            let result = tokio::time::timeout(self.timeout, self.provider.current_user(token))
                .await
                .unwrap_or(Err(SessionError::Timeout));

            match result {
                Ok(user) => return Ok(user),
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "session fetch failed, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// resolve
    ///
    /// Converts the outcome of a session fetch into the state the gate evaluates. Errors are
    /// logged and swallowed here; they never reach the user as an error.
    pub async fn resolve(&self, token: Option<&str>) -> Session {
        let Some(token) = token else {
            tracing::debug!("no session token presented");
            return Session::Failed;
        };
        match self.fetch_user(token).await {
            Ok(user) => Session::Active(user),
            Err(SessionError::NoSession) => {
                tracing::debug!("session rejected by backend");
                Session::Failed
            }
            Err(e) => {
                tracing::warn!(error = %e, "session fetch failed, treating as signed out");
                Session::Failed
            }
        }
    }
}
