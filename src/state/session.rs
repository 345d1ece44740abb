//! The canonical session snapshot.
//!
//! `Session` is immutable from the outside: only the session controller builds
//! new values, and `is_authenticated` is derived from `profile` and `token`
//! rather than stored, so the two can never disagree.

use crate::net::types::{IdentityAssertion, Profile};

/// Query value that matches any role, signed in or not.
pub const ANY_ROLE: &str = "*";

/// Last failure recorded on the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionError {
    pub message: String,
}

impl SessionError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Named states of the session lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the identity provider's first notification.
    Resolving,
    Anonymous,
    /// A login or logout is in flight.
    Authenticating,
    Authenticated,
    /// Signed in, but the last profile refresh failed.
    AuthenticatedStale,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    resolved: bool,
    is_loading: bool,
    identity: Option<IdentityAssertion>,
    profile: Option<Profile>,
    token: Option<String>,
    error: Option<SessionError>,
}

impl Default for Session {
    fn default() -> Self {
        Self::resolving()
    }
}

impl Session {
    /// Start-of-process state: loading, nothing known.
    #[must_use]
    pub fn resolving() -> Self {
        Self { resolved: false, is_loading: true, identity: None, profile: None, token: None, error: None }
    }

    #[must_use]
    pub fn anonymous(error: Option<SessionError>) -> Self {
        Self { resolved: true, is_loading: false, identity: None, profile: None, token: None, error }
    }

    #[must_use]
    pub fn authenticated(identity: Option<IdentityAssertion>, profile: Profile, token: String) -> Self {
        Self { resolved: true, is_loading: false, identity, profile: Some(profile), token: Some(token), error: None }
    }

    /// Same state with the loading flag raised.
    #[must_use]
    pub(crate) fn loading(mut self) -> Self {
        self.is_loading = true;
        self.error = None;
        self
    }

    /// Same identity, profile and token, with a failure attached.
    #[must_use]
    pub(crate) fn stale(mut self, error: SessionError) -> Self {
        self.is_loading = false;
        self.error = Some(error);
        self
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.profile.is_some() && self.token.is_some()
    }

    #[must_use]
    pub fn identity(&self) -> Option<&IdentityAssertion> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        match (self.resolved, self.is_loading, self.is_authenticated(), self.error.is_some()) {
            (false, _, _, _) => SessionPhase::Resolving,
            (true, true, _, _) => SessionPhase::Authenticating,
            (true, false, true, true) => SessionPhase::AuthenticatedStale,
            (true, false, true, false) => SessionPhase::Authenticated,
            (true, false, false, _) => SessionPhase::Anonymous,
        }
    }

    /// True if any queried role is `"*"`, or the signed-in role is among
    /// the queried roles.
    #[must_use]
    pub fn has_role<R: AsRef<str>>(&self, roles: &[R]) -> bool {
        if roles.iter().any(|r| r.as_ref() == ANY_ROLE) {
            return true;
        }
        if !self.is_authenticated() {
            return false;
        }
        self.profile
            .as_ref()
            .is_some_and(|p| roles.iter().any(|r| r.as_ref() == p.role.as_str()))
    }

    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.is_authenticated() && self.profile.as_ref().is_some_and(|p| p.permissions.contains(permission))
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
