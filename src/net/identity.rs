//! Identity provider client.
//!
//! SYSTEM CONTEXT
//! ==============
//! The provider exchanges email/password for an identity assertion plus a
//! short-lived ID token, and pushes session changes to every subscriber. The
//! session controller consumes those changes on one task; the provider never
//! talks to the backend itself.
//!
//! DESIGN
//! ======
//! [`IdentityProvider`] is the seam the controller depends on.
//! [`IdentityToolkitClient`] implements it over the Identity Toolkit REST API
//! and persists its refresh token under [`IDENTITY_SESSION_KEY`] so a restart
//! can resume. [`SessionChanges`] fans changes out on per-subscriber unbounded
//! channels; a late subscriber immediately receives the latest state.
//!
//! ERROR HANDLING
//! ==============
//! Provider error strings (`INVALID_PASSWORD`, `EMAIL_NOT_FOUND`, ...) are
//! mapped to `auth/*` codes in [`map_provider_error`]. Only a 4xx response
//! with that error body counts as a rejection; 5xx and unparseable bodies are
//! transport failures. A rejected token refresh ends the provider session and
//! broadcasts `SignedOut`; a transport failure during refresh leaves the
//! session in place.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::types::IdentityAssertion;
use crate::config::IdentityConfig;
use crate::error::IdentityError;
use crate::util::storage::KeyValueStore;

pub const IDENTITY_SESSION_KEY: &str = "identity_session";

/// Tokens within this many seconds of expiry are refreshed before use.
pub const TOKEN_REFRESH_SKEW_SECS: i64 = 60;

const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// A provider-side session transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionChange {
    SignedIn(IdentityAssertion),
    SignedOut,
}

/// Result of a successful email/password exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignIn {
    pub assertion: IdentityAssertion,
    pub token: String,
}

/// Identity operations the session controller needs.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange credentials for an assertion and a bearer token. Also
    /// broadcasts [`SessionChange::SignedIn`] to subscribers.
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, IdentityError>;

    /// End the provider session and broadcast [`SessionChange::SignedOut`].
    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// A valid token for the current session, refreshing it if needed.
    async fn current_token(&self) -> Result<Option<String>, IdentityError>;

    /// Ordered stream of session changes. Once the provider has resolved its
    /// initial state, the first message is that state.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionChange>;
}

// =============================================================================
// CHANGE FAN-OUT
// =============================================================================

#[derive(Debug, Default)]
struct ChangesInner {
    subscribers: Vec<mpsc::UnboundedSender<SessionChange>>,
    latest: Option<SessionChange>,
}

/// Broadcasts session changes to every live subscriber, in publish order.
#[derive(Debug, Default)]
pub struct SessionChanges {
    inner: Mutex<ChangesInner>,
}

impl SessionChanges {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionChange> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(latest) = &inner.latest {
            let _ = tx.send(latest.clone());
        }
        inner.subscribers.push(tx);
        rx
    }

    /// Record `change` as the latest state and deliver it. Closed
    /// subscribers are dropped.
    pub fn publish(&self, change: SessionChange) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
        inner.latest = Some(change);
    }
}

// =============================================================================
// IDENTITY TOOLKIT CLIENT
// =============================================================================

/// Provider session persisted across restarts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct StoredSession {
    id_token: String,
    refresh_token: String,
    /// Unix seconds.
    expires_at: i64,
    assertion: IdentityAssertion,
}

/// [`IdentityProvider`] backed by the Identity Toolkit REST endpoints.
pub struct IdentityToolkitClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    token_url: String,
    store: Arc<dyn KeyValueStore>,
    session: tokio::sync::Mutex<Option<StoredSession>>,
    changes: SessionChanges,
}

impl IdentityToolkitClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: &IdentityConfig,
        store: Arc<dyn KeyValueStore>,
        timeout: Option<Duration>,
    ) -> Result<Self, IdentityError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| IdentityError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            token_url: config.token_url.trim_end_matches('/').to_owned(),
            store,
            session: tokio::sync::Mutex::new(None),
            changes: SessionChanges::new(),
        })
    }

    /// Resume a persisted provider session, then publish the first change.
    ///
    /// The stored token is not checked here; [`IdentityProvider::current_token`]
    /// refreshes it on first use.
    pub async fn restore(&self) {
        let stored = self
            .store
            .get(IDENTITY_SESSION_KEY)
            .and_then(|raw| match serde_json::from_str::<StoredSession>(&raw) {
                Ok(session) => Some(session),
                Err(e) => {
                    tracing::warn!(error = %e, "discarding unreadable identity session");
                    None
                }
            });

        let mut session = self.session.lock().await;
        match stored {
            Some(stored) => {
                tracing::info!(subject = %stored.assertion.subject_id, "resuming identity session");
                let assertion = stored.assertion.clone();
                *session = Some(stored);
                self.changes.publish(SessionChange::SignedIn(assertion));
            }
            None => {
                *session = None;
                self.changes.publish(SessionChange::SignedOut);
            }
        }
    }

    fn api_key(&self) -> Result<&str, IdentityError> {
        self.api_key.as_deref().filter(|k| !k.is_empty()).ok_or(IdentityError::NotConfigured)
    }

    fn persist(&self, session: &StoredSession) -> Result<(), IdentityError> {
        let raw = serde_json::to_string(session).map_err(|e| IdentityError::Storage(e.to_string()))?;
        self.store
            .set(IDENTITY_SESSION_KEY, &raw)
            .map_err(|e| IdentityError::Storage(e.to_string()))
    }

    fn forget(&self) -> Result<(), IdentityError> {
        self.store.remove(IDENTITY_SESSION_KEY).map_err(|e| IdentityError::Storage(e.to_string()))
    }

    async fn post_json<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<String, IdentityError> {
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;
        read_body(resp).await
    }

    /// Best-effort `accounts:lookup` for the fields sign-in does not return.
    async fn lookup(&self, key: &str, id_token: &str) -> Option<LookupUser> {
        let url = format!("{}/accounts:lookup?key={key}", self.base_url);
        let raw = match self.post_json(&url, &serde_json::json!({ "idToken": id_token })).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(error = %e, "account lookup failed");
                return None;
            }
        };
        serde_json::from_str::<LookupResponse>(&raw).ok()?.users.into_iter().next()
    }

    async fn refresh(&self, key: &str, stored: &StoredSession) -> Result<StoredSession, IdentityError> {
        let url = format!("{}/token?key={key}", self.token_url);
        let resp = self
            .http
            .post(&url)
            .form(&[("grant_type", "refresh_token"), ("refresh_token", stored.refresh_token.as_str())])
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;
        let raw = read_body(resp).await?;
        let refreshed: RefreshResponse =
            serde_json::from_str(&raw).map_err(|e| IdentityError::Transport(e.to_string()))?;
        Ok(StoredSession {
            id_token: refreshed.id_token,
            refresh_token: refreshed.refresh_token,
            expires_at: unix_now() + parse_lifetime(refreshed.expires_in.as_deref()),
            assertion: stored.assertion.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, IdentityError> {
        let key = self.api_key()?;
        let url = format!("{}/accounts:signInWithPassword?key={key}", self.base_url);
        let body = SignInRequest { email, password, return_secure_token: true };
        let raw = self.post_json(&url, &body).await?;
        let signed: SignInResponse = serde_json::from_str(&raw).map_err(|e| IdentityError::Transport(e.to_string()))?;

        let looked_up = self.lookup(key, &signed.id_token).await;
        let assertion = IdentityAssertion {
            subject_id: signed.local_id,
            email: signed.email.filter(|e| !e.is_empty()),
            display_name: signed.display_name.filter(|n| !n.is_empty()),
            photo_url: looked_up.as_ref().and_then(|u| u.photo_url.clone()),
            email_verified: looked_up.is_some_and(|u| u.email_verified),
        };
        let stored = StoredSession {
            id_token: signed.id_token.clone(),
            refresh_token: signed.refresh_token,
            expires_at: unix_now() + parse_lifetime(signed.expires_in.as_deref()),
            assertion: assertion.clone(),
        };

        let mut session = self.session.lock().await;
        if let Err(e) = self.persist(&stored) {
            tracing::warn!(error = %e, "identity session will not survive a restart");
        }
        *session = Some(stored);
        self.changes.publish(SessionChange::SignedIn(assertion.clone()));
        tracing::info!(subject = %assertion.subject_id, "identity sign-in succeeded");

        Ok(SignIn { assertion, token: signed.id_token })
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        let mut session = self.session.lock().await;
        *session = None;
        let result = self.forget();
        self.changes.publish(SessionChange::SignedOut);
        result
    }

    async fn current_token(&self) -> Result<Option<String>, IdentityError> {
        let mut session = self.session.lock().await;
        let Some(stored) = session.as_ref() else {
            return Ok(None);
        };
        if stored.expires_at - TOKEN_REFRESH_SKEW_SECS > unix_now() {
            return Ok(Some(stored.id_token.clone()));
        }

        let key = self.api_key()?;
        match self.refresh(key, stored).await {
            Ok(refreshed) => {
                if let Err(e) = self.persist(&refreshed) {
                    tracing::warn!(error = %e, "failed to persist refreshed identity session");
                }
                let token = refreshed.id_token.clone();
                *session = Some(refreshed);
                Ok(Some(token))
            }
            Err(err @ IdentityError::Rejected { .. }) => {
                tracing::warn!(error = %err, "token refresh rejected; ending identity session");
                *session = None;
                if let Err(e) = self.forget() {
                    tracing::warn!(error = %e, "failed to clear identity session");
                }
                self.changes.publish(SessionChange::SignedOut);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionChange> {
        self.changes.subscribe()
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    photo_url: Option<String>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

// =============================================================================
// HELPERS
// =============================================================================

async fn read_body(resp: reqwest::Response) -> Result<String, IdentityError> {
    let status = resp.status();
    let raw = resp.text().await.map_err(|e| IdentityError::Transport(e.to_string()))?;
    if status.is_success() {
        return Ok(raw);
    }
    // Only a 4xx carrying the provider's error envelope is a refusal. Anything
    // else (5xx, proxy pages) is a transport failure and leaves sessions alone.
    match serde_json::from_str::<ErrorEnvelope>(&raw) {
        Ok(env) if status.is_client_error() => Err(map_provider_error(&env.error.message)),
        _ => Err(IdentityError::Transport(format!("HTTP {status}"))),
    }
}

/// Map a provider error string to a rejection carrying an `auth/*` code.
#[must_use]
pub fn map_provider_error(message: &str) -> IdentityError {
    let head = message
        .split(|c: char| c == ':' || c.is_whitespace())
        .next()
        .unwrap_or_default();
    let code = if message.starts_with("API key not valid") {
        "auth/invalid-api-key"
    } else {
        match head {
            "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => "auth/user-not-found",
            "INVALID_PASSWORD" => "auth/wrong-password",
            "USER_DISABLED" => "auth/user-disabled",
            "TOO_MANY_ATTEMPTS_TRY_LATER" => "auth/too-many-requests",
            "INVALID_LOGIN_CREDENTIALS" => "auth/invalid-credential",
            "INVALID_EMAIL" => "auth/invalid-email",
            "OPERATION_NOT_ALLOWED" | "PASSWORD_LOGIN_DISABLED" => "auth/operation-not-allowed",
            "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" => "auth/user-token-expired",
            _ => "auth/internal-error",
        }
    };
    IdentityError::Rejected { code: code.to_owned(), message: message.to_owned() }
}

fn parse_lifetime(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.parse::<i64>().ok()).unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
}

fn unix_now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
