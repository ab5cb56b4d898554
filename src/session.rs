// ABOUTME: Garmin session lifecycle: credential login, cookie persistence, validity probing
// ABOUTME: Process-scoped SessionManager with single-flight login and a pluggable session store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 scale-sync contributors

//! Destination authentication state.
//!
//! One [`SessionManager`] owns the session for the whole process. A session
//! moves through three states: *absent* (nothing cached or persisted),
//! *valid* (a probe against an authenticated resource answered 2xx), and
//! *stale* (probe failed; the next [`SessionManager::ensure_authenticated`]
//! performs a credential login and overwrites the persisted blob).
//!
//! The entire ensure path runs under one async mutex, so overlapping callers
//! single-flight: only one login happens, the rest observe the fresh session.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use reqwest::{Client, ClientBuilder};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::errors::{AppResult, SyncError};
use crate::models::Session;

/// Browser-like user agent Garmin expects on session traffic
pub(crate) const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Shared HTTP client carrying the per-call timeouts from configuration.
///
/// The builder only fails on broken TLS backends; the fallback client loses
/// the configured timeouts, so it is logged loudly rather than silently.
pub(crate) fn http_client(config: &SyncConfig) -> Client {
    ClientBuilder::new()
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "HTTP client build failed; falling back to reqwest default timeouts");
            Client::new()
        })
}

/// HTTP side of authentication, split out so the manager's control flow is
/// testable without a live endpoint
#[async_trait]
pub trait AuthTransport: Send + Sync {
    /// Lightweight probe of an authenticated resource; `true` means the
    /// session still signs requests
    async fn probe(&self, session: &Session) -> AppResult<bool>;

    /// Credential login; returns the fresh cookie set on success
    async fn login(&self, username: &str, password: &str) -> AppResult<Session>;
}

#[async_trait]
impl<T: AuthTransport + ?Sized> AuthTransport for Arc<T> {
    async fn probe(&self, session: &Session) -> AppResult<bool> {
        (**self).probe(session).await
    }

    async fn login(&self, username: &str, password: &str) -> AppResult<Session> {
        (**self).login(username, password).await
    }
}

/// Production [`AuthTransport`] speaking to the Garmin SSO and Connect hosts
pub struct HttpAuthTransport {
    client: Client,
    sso_url: String,
    connect_url: String,
}

impl HttpAuthTransport {
    /// Build the transport with the per-call timeouts from configuration
    #[must_use]
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            client: http_client(config),
            sso_url: config.sso_url.clone(),
            connect_url: config.connect_url.clone(),
        }
    }
}

#[async_trait]
impl AuthTransport for HttpAuthTransport {
    async fn probe(&self, session: &Session) -> AppResult<bool> {
        let url = format!("{}/modern/", self.connect_url);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(COOKIE, session.cookie_header())
            .send()
            .await;

        // A transport failure counts as a failed probe, not a hard error;
        // the caller falls through to a credential login.
        match response {
            Ok(r) => Ok(r.status().is_success()),
            Err(e) => {
                debug!(error = %e, "session probe failed at transport level");
                Ok(false)
            }
        }
    }

    async fn login(&self, username: &str, password: &str) -> AppResult<Session> {
        let url = format!("{}/signin", self.sso_url);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&[
                ("username", username),
                ("password", password),
                ("embed", "false"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::AuthRejected { status });
        }

        let cookies: Vec<String> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .map(str::to_owned)
            .collect();

        Ok(Session { cookies })
    }
}

/// Persistence seam for the one session blob
pub trait SessionStore: Send + Sync {
    /// Load the persisted session, if any
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SessionStore`] on filesystem failures other than
    /// the blob simply not existing.
    fn load(&self) -> AppResult<Option<Session>>;

    /// Persist the session, fully replacing any prior value
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SessionStore`] if the blob cannot be written.
    fn save(&self, session: &Session) -> AppResult<()>;

    /// Erase the persisted session
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SessionStore`] if an existing blob cannot be
    /// removed.
    fn clear(&self) -> AppResult<()>;
}

impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    fn load(&self) -> AppResult<Option<Session>> {
        (**self).load()
    }

    fn save(&self, session: &Session) -> AppResult<()> {
        (**self).save(session)
    }

    fn clear(&self) -> AppResult<()> {
        (**self).clear()
    }
}

/// File-backed [`SessionStore`] holding one JSON blob at a fixed path
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Create a store at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> AppResult<Option<Session>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SyncError::SessionStore { source: e }),
        };

        // A corrupt blob is treated as absent; the next login rewrites it.
        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(error = %e, "persisted session blob is unreadable; ignoring it");
                Ok(None)
            }
        }
    }

    fn save(&self, session: &Session) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| SyncError::SessionStore { source: e })?;
        }
        let raw = serde_json::to_string(session)?;
        fs::write(&self.path, raw).map_err(|e| SyncError::SessionStore { source: e })
    }

    fn clear(&self) -> AppResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SyncError::SessionStore { source: e }),
        }
    }
}

/// In-memory [`SessionStore`] for tests and ephemeral embedders
#[derive(Default)]
pub struct MemorySessionStore {
    inner: StdMutex<Option<Session>>,
}

impl MemorySessionStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> AppResult<Option<Session>> {
        match self.inner.lock() {
            Ok(guard) => Ok(guard.clone()),
            Err(_) => Ok(None),
        }
    }

    fn save(&self, session: &Session) -> AppResult<()> {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = Some(session.clone());
        }
        Ok(())
    }

    fn clear(&self) -> AppResult<()> {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = None;
        }
        Ok(())
    }
}

#[derive(Default)]
struct CachedSession {
    session: Option<Session>,
    validated: bool,
}

/// Process-scoped owner of the Garmin session
pub struct SessionManager {
    transport: Box<dyn AuthTransport>,
    store: Box<dyn SessionStore>,
    username: Option<String>,
    password: Option<String>,
    cached: Mutex<CachedSession>,
}

impl SessionManager {
    /// Build the manager; credentials may be absent until a login is needed
    #[must_use]
    pub fn new(
        transport: Box<dyn AuthTransport>,
        store: Box<dyn SessionStore>,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        Self {
            transport,
            store,
            username,
            password,
            cached: Mutex::new(CachedSession::default()),
        }
    }

    /// Return a session that currently authenticates requests.
    ///
    /// A validated in-memory session returns immediately with zero HTTP
    /// calls. Otherwise the persisted blob is loaded and probed once; a
    /// failed or absent probe triggers a credential login whose cookie set
    /// unconditionally replaces the persisted blob. The whole path holds the
    /// manager lock, so concurrent callers reuse one in-flight login.
    ///
    /// # Errors
    ///
    /// [`SyncError::CredentialsMissing`] when a login is needed but either
    /// credential is unset, [`SyncError::AuthRejected`] when the sign-in
    /// endpoint refuses the credentials, or a store/transport error.
    pub async fn ensure_authenticated(&self) -> AppResult<Session> {
        let mut cached = self.cached.lock().await;

        if cached.validated {
            if let Some(session) = &cached.session {
                return Ok(session.clone());
            }
        }

        if cached.session.is_none() {
            cached.session = self.store.load()?;
        }

        if let Some(session) = cached.session.clone() {
            if self.transport.probe(&session).await? {
                debug!("existing Garmin session is still valid");
                cached.validated = true;
                return Ok(session);
            }
            debug!("cached Garmin session failed the probe; re-authenticating");
        }

        let (username, password) = match (&self.username, &self.password) {
            (Some(u), Some(p)) => (u.as_str(), p.as_str()),
            _ => return Err(SyncError::CredentialsMissing),
        };

        let session = self.transport.login(username, password).await?;
        self.store.save(&session)?;
        info!("logged in to Garmin and persisted a fresh session");

        cached.session = Some(session.clone());
        cached.validated = true;
        Ok(session)
    }

    /// Mark the cached session stale so the next ensure probes again.
    ///
    /// Used for the single transparent re-login after an upload answers
    /// 401/403 with a session that probed fine moments earlier.
    pub async fn invalidate(&self) {
        let mut cached = self.cached.lock().await;
        cached.validated = false;
    }

    /// Explicit logout: drop the cached session and erase the persisted blob
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SessionStore`] if the persisted blob cannot be
    /// removed.
    pub async fn reset(&self) -> AppResult<()> {
        let mut cached = self.cached.lock().await;
        cached.session = None;
        cached.validated = false;
        self.store.clear()?;
        info!("Garmin session cleared");
        Ok(())
    }
}
