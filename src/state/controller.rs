//! Session controller: the only writer of the canonical [`Session`].
//!
//! SYSTEM CONTEXT
//! ==============
//! Composes the identity provider (who the user is) and the profile backend
//! (what the user may do). Routes, menus and pages read the session through
//! [`SessionController::subscribe`] or [`SessionController::snapshot`] and never
//! mutate it.
//!
//! DESIGN
//! ======
//! Two writers feed the session. Explicit calls (`login`, `logout`,
//! `refresh_profile`) update it directly. Provider notifications arrive on one
//! channel and are handled one at a time by the task started with
//! [`SessionController::spawn`]; that stream is the durable source of truth.
//!
//! Every write carries the operation epoch it started under. `login` and
//! `logout` open a new epoch; notifications and refreshes reuse the current
//! one. A write whose epoch is no longer current is dropped, so a slow profile
//! fetch can never overwrite the outcome of a newer login or logout.
//!
//! ERROR HANDLING
//! ==============
//! Login failures reset the session and propagate. Logout never fails; identity
//! errors become notices and backend errors are logged. A failed profile
//! refresh is fatal to the session: notice, hard redirect to the login path
//! (left to the HTTP client's 401 hook when the backend answered 401), then
//! provider sign-out.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::events::{Navigation, NoticeLevel, Outbox};
use super::session::{Session, SessionError};
use crate::error::{AuthError, friendly_message};
use crate::net::identity::{IdentityProvider, SessionChange};
use crate::net::profile::ProfileBackend;
use crate::net::types::IdentityAssertion;
use crate::util::credentials::CredentialStore;

/// Session error recorded when a provider notification cannot be resolved to
/// a backend profile.
pub const PROFILE_FETCH_FAILED: &str = "Failed to fetch user data";

pub struct SessionController {
    identity: Arc<dyn IdentityProvider>,
    backend: Arc<dyn ProfileBackend>,
    credentials: CredentialStore,
    session: watch::Sender<Session>,
    epoch: AtomicU64,
    outbox: Outbox,
    login_path: String,
}

impl SessionController {
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        backend: Arc<dyn ProfileBackend>,
        credentials: CredentialStore,
        outbox: Outbox,
        login_path: impl Into<String>,
    ) -> Self {
        let (session, _) = watch::channel(Session::resolving());
        Self {
            identity,
            backend,
            credentials,
            session,
            epoch: AtomicU64::new(0),
            outbox,
            login_path: login_path.into(),
        }
    }

    // =========================================================================
    // READ SIDE
    // =========================================================================

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.session.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    /// Wait until the provider's first notification has been handled.
    pub async fn resolved(&self) -> Session {
        let mut rx = self.session.subscribe();
        match rx.wait_for(Session::is_resolved).await {
            Ok(session) => session.clone(),
            // The sender lives in `self`, so the channel cannot close here.
            Err(_) => self.snapshot(),
        }
    }

    #[must_use]
    pub fn has_role<R: AsRef<str>>(&self, roles: &[R]) -> bool {
        self.session.borrow().has_role(roles)
    }

    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.session.borrow().has_permission(permission)
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    // =========================================================================
    // EXPLICIT OPERATIONS
    // =========================================================================

    /// Sign in with the provider, then resolve the backend profile.
    ///
    /// # Errors
    ///
    /// Returns the normalised failure. The session is anonymous with the
    /// failure recorded, unless a newer operation has already replaced it.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let epoch = self.begin();
        tracing::info!(epoch, "login started");

        let signed = match self.identity.sign_in(email, password).await {
            Ok(signed) => signed,
            Err(e) => {
                let err = AuthError::from(e);
                tracing::warn!(error = %err, code = ?err.code, "identity sign-in failed");
                self.commit(epoch, Session::anonymous(Some(SessionError::new(err.message.clone()))));
                return Err(err);
            }
        };

        let profile = match self.backend.fetch_profile(&signed.token).await {
            Ok(profile) => profile,
            Err(e) => {
                let err = AuthError::from(e);
                tracing::warn!(error = %err, "profile fetch after sign-in failed");
                // Sign out while still loading so the pending SignedIn notification is skipped.
                if self.is_current(epoch) {
                    if let Err(e) = self.identity.sign_out().await {
                        tracing::warn!(error = %e, "identity sign-out after failed login failed");
                    }
                }
                self.commit(epoch, Session::anonymous(Some(SessionError::new(err.message.clone()))));
                return Err(err);
            }
        };

        let user_id = profile.id.clone();
        let next = Session::authenticated(Some(signed.assertion), profile, signed.token.clone());
        if !self.commit(epoch, next) {
            return Err(AuthError::superseded());
        }
        self.credentials.set(&signed.token);
        tracing::info!(%user_id, "login succeeded");
        Ok(())
    }

    /// End the session. Local state and the stored token are cleared unless a
    /// newer login has started in the meantime.
    pub async fn logout(&self) {
        let epoch = self.begin();
        // Captured before the provider sign-out, whose notification clears the store.
        let token = self.session.borrow().token().map(str::to_owned).or_else(|| self.credentials.get());

        if let Err(e) = self.identity.sign_out().await {
            let err = AuthError::from(e);
            tracing::warn!(error = %err, "identity sign-out failed");
            self.outbox.notify(NoticeLevel::Error, format!("Logout failed {}", friendly_message(&err)));
        }

        if let Some(token) = token {
            if let Err(e) = self.backend.sign_out(&token).await {
                tracing::warn!(error = %e, "backend logout failed");
            }
        }

        // Cleared under the epoch check: a login started meanwhile keeps its token.
        let current = self.commit_with(epoch, |s| {
            self.credentials.clear();
            let next = Session::anonymous(None);
            if *s == next {
                return false;
            }
            *s = next;
            true
        });
        tracing::info!(epoch, current, "logout finished");
    }

    /// Re-fetch the profile for the current token. Does nothing when signed out.
    pub async fn refresh_profile(&self) {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let Some(token) = self.session.borrow().token().map(str::to_owned) else {
            return;
        };

        match self.backend.fetch_profile(&token).await {
            Ok(profile) => {
                self.commit_with(epoch, |s| {
                    let Some(current) = s.token() else { return false };
                    if current != token {
                        return false;
                    }
                    *s = Session::authenticated(s.identity().cloned(), profile, token.clone());
                    true
                });
            }
            Err(e) => {
                // The HTTP client already redirected to login on a 401.
                let redirected = e.is_unauthorized();
                let err = AuthError::from(e);
                tracing::warn!(error = %err, "profile refresh failed");
                self.outbox.notify(NoticeLevel::Error, format!("Refresh user failed {}", err.message));
                let applied = self.commit_with(epoch, |s| {
                    *s = s.clone().stale(SessionError::new(err.message.clone()));
                    true
                });
                if applied {
                    if !redirected {
                        self.outbox.navigate(Navigation::Hard { to: self.login_path.clone() });
                    }
                    if let Err(e) = self.identity.sign_out().await {
                        tracing::warn!(error = %e, "identity sign-out after failed refresh failed");
                    }
                }
            }
        }
    }

    // =========================================================================
    // NOTIFICATIONS
    // =========================================================================

    /// Start the task that applies provider notifications for as long as the
    /// provider keeps the stream open.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let mut changes = self.identity.subscribe();
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(change) = changes.recv().await {
                controller.handle_change(change).await;
            }
            tracing::debug!("identity change stream closed");
        })
    }

    /// Apply one provider notification.
    pub async fn handle_change(&self, change: SessionChange) {
        let epoch = self.epoch.load(Ordering::SeqCst);
        match change {
            SessionChange::SignedIn(assertion) => self.apply_signed_in(epoch, assertion).await,
            SessionChange::SignedOut => self.apply_signed_out(epoch),
        }
    }

    async fn apply_signed_in(&self, epoch: u64, assertion: IdentityAssertion) {
        {
            let current = self.session.borrow();
            if current.is_resolved() && current.is_loading() {
                tracing::debug!(subject = %assertion.subject_id, "explicit operation in flight; notification left to it");
                return;
            }
            if current.is_authenticated()
                && current.identity().is_some_and(|i| i.subject_id == assertion.subject_id)
            {
                return;
            }
        }

        let token = match self.identity.current_token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                self.apply_signed_out(epoch);
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not obtain identity token");
                self.fail_resolution(epoch).await;
                return;
            }
        };

        match self.backend.fetch_profile(&token).await {
            Ok(profile) => {
                let user_id = profile.id.clone();
                if self.commit(epoch, Session::authenticated(Some(assertion), profile, token.clone())) {
                    self.credentials.set(&token);
                    tracing::info!(%user_id, "session authenticated");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "profile fetch for identity session failed");
                self.fail_resolution(epoch).await;
            }
        }
    }

    async fn fail_resolution(&self, epoch: u64) {
        if self.commit(epoch, Session::anonymous(Some(SessionError::new(PROFILE_FETCH_FAILED)))) {
            if let Err(e) = self.identity.sign_out().await {
                tracing::warn!(error = %e, "forced identity sign-out failed");
            }
        }
    }

    fn apply_signed_out(&self, epoch: u64) {
        let applied = self.commit_with(epoch, |s| {
            if s.is_resolved() && s.is_loading() {
                return false;
            }
            // An unauthenticated session keeps the error that ended it.
            let error = if s.is_authenticated() { None } else { s.error().cloned() };
            let next = Session::anonymous(error);
            if *s == next {
                return false;
            }
            *s = next;
            true
        });
        if applied && !self.session.borrow().is_loading() {
            self.credentials.clear();
        }
    }

    // =========================================================================
    // EPOCHS
    // =========================================================================

    /// Open a new epoch and raise the loading flag.
    fn begin(&self) -> u64 {
        let mut epoch = 0;
        self.session.send_modify(|s| {
            epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            *s = s.clone().loading();
        });
        epoch
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    /// Replace the session if `epoch` is still current.
    fn commit(&self, epoch: u64, next: Session) -> bool {
        self.commit_with(epoch, |s| {
            if *s == next {
                return false;
            }
            *s = next;
            true
        })
    }

    /// Run `update` under the session lock if `epoch` is still current.
    /// Returns whether the epoch check passed; `update` reports whether it
    /// changed anything.
    fn commit_with(&self, epoch: u64, update: impl FnOnce(&mut Session) -> bool) -> bool {
        let mut current = false;
        self.session.send_if_modified(|s| {
            if !self.is_current(epoch) {
                return false;
            }
            current = true;
            update(s)
        });
        if !current {
            tracing::debug!(epoch, "discarding superseded session update");
        }
        current
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
