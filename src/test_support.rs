//! Shared fakes for unit tests: an in-process HTTP backend, a scripted
//! identity provider, and a scripted profile backend.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{IdentityError, ProfileFetchError};
use crate::net::api::ApiError;
use crate::net::identity::{IdentityProvider, SessionChange, SessionChanges, SignIn};
use crate::net::profile::ProfileBackend;
use crate::net::types::{AccountStatus, IdentityAssertion, Profile, Role};
use crate::util::credentials::CredentialStore;
use crate::util::storage::MemoryStore;

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_backend(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn memory_credentials() -> CredentialStore {
    CredentialStore::new(Arc::new(MemoryStore::new()))
}

pub fn assertion(subject: &str) -> IdentityAssertion {
    IdentityAssertion {
        subject_id: subject.to_owned(),
        email: Some(format!("{subject}@example.com")),
        display_name: None,
        photo_url: None,
        email_verified: true,
    }
}

pub fn profile(role: Role, permissions: &[&str]) -> Profile {
    Profile {
        id: "u-1".to_owned(),
        identity_uid: "fb-1".to_owned(),
        name: "Alice".to_owned(),
        email: "alice@example.com".to_owned(),
        role,
        status: AccountStatus::Active,
        permissions: permissions.iter().map(|p| (*p).to_owned()).collect(),
        avatar: None,
        phone: None,
    }
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Scripted identity provider. Sign-in results are popped in order; an
/// empty script signs in successfully with `token-<n>`.
#[derive(Default)]
pub struct MockIdentity {
    pub changes: SessionChanges,
    pub sign_in_results: Mutex<VecDeque<Result<SignIn, IdentityError>>>,
    pub sign_out_error: Mutex<Option<IdentityError>>,
    pub token: Mutex<Option<String>>,
    pub sign_in_calls: Mutex<usize>,
    pub sign_out_calls: Mutex<usize>,
    /// When true, sign-in does not broadcast `SignedIn`.
    pub silent: bool,
}

impl MockIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn silent() -> Self {
        Self { silent: true, ..Self::default() }
    }

    pub fn push_sign_in(&self, result: Result<SignIn, IdentityError>) {
        self.sign_in_results.lock().unwrap().push_back(result);
    }

    pub fn sign_outs(&self) -> usize {
        *self.sign_out_calls.lock().unwrap()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentity {
    async fn sign_in(&self, email: &str, _password: &str) -> Result<SignIn, IdentityError> {
        let n = {
            let mut calls = self.sign_in_calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        let scripted = self.sign_in_results.lock().unwrap().pop_front();
        let result = scripted.unwrap_or_else(|| {
            let subject = email.split('@').next().unwrap_or("user");
            Ok(SignIn { assertion: assertion(subject), token: format!("token-{n}") })
        });
        if let Ok(sign_in) = &result {
            *self.token.lock().unwrap() = Some(sign_in.token.clone());
            if !self.silent {
                self.changes.publish(SessionChange::SignedIn(sign_in.assertion.clone()));
            }
        }
        result
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        *self.sign_out_calls.lock().unwrap() += 1;
        *self.token.lock().unwrap() = None;
        if !self.silent {
            self.changes.publish(SessionChange::SignedOut);
        }
        match self.sign_out_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn current_token(&self) -> Result<Option<String>, IdentityError> {
        Ok(self.token.lock().unwrap().clone())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionChange> {
        self.changes.subscribe()
    }
}

// =============================================================================
// BACKEND
// =============================================================================

/// Scripted profile backend. `profile` is returned for every fetch unless a
/// scripted failure is queued.
pub struct MockBackend {
    pub profile: Mutex<Profile>,
    pub fetch_failures: Mutex<VecDeque<ApiError>>,
    pub sign_out_fails: bool,
    /// Fetches started, including ones still held by `gate`.
    pub fetch_calls: Mutex<usize>,
    pub fetched_tokens: Mutex<Vec<String>>,
    pub sign_out_calls: Mutex<usize>,
    /// Hold each fetch until a permit is released.
    pub gate: Option<Arc<tokio::sync::Semaphore>>,
    /// Hold each sign-out until a permit is released.
    pub sign_out_gate: Option<Arc<tokio::sync::Semaphore>>,
}

impl MockBackend {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile: Mutex::new(profile),
            fetch_failures: Mutex::new(VecDeque::new()),
            sign_out_fails: false,
            fetch_calls: Mutex::new(0),
            fetched_tokens: Mutex::new(Vec::new()),
            sign_out_calls: Mutex::new(0),
            gate: None,
            sign_out_gate: None,
        }
    }

    pub fn fail_next_fetch(&self, err: ApiError) {
        self.fetch_failures.lock().unwrap().push_back(err);
    }
}

#[async_trait]
impl ProfileBackend for MockBackend {
    async fn fetch_profile(&self, token: &str) -> Result<Profile, ProfileFetchError> {
        *self.fetch_calls.lock().unwrap() += 1;
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.fetched_tokens.lock().unwrap().push(token.to_owned());
        if let Some(err) = self.fetch_failures.lock().unwrap().pop_front() {
            return Err(ProfileFetchError(err));
        }
        Ok(self.profile.lock().unwrap().clone())
    }

    async fn sign_out(&self, _token: &str) -> Result<(), ProfileFetchError> {
        *self.sign_out_calls.lock().unwrap() += 1;
        if let Some(gate) = &self.sign_out_gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.sign_out_fails {
            return Err(ProfileFetchError(ApiError::Status {
                status: 500,
                message: Some("backend down".to_owned()),
                code: None,
            }));
        }
        Ok(())
    }
}
