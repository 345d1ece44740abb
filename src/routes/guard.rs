//! Route guards: pure decisions over a [`Session`] snapshot.
//!
//! A guard never navigates on its own. It returns a [`GuardOutcome`] and the
//! caller renders, shows a spinner, or performs the redirect. Every redirect
//! is a replace navigation so the back button does not return to a page the
//! guard refused.

use crate::state::session::Session;

pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";
pub const DEFAULT_PUBLIC_REDIRECT: &str = "/";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Session still resolving or an operation is in flight.
    Loading,
    Render,
    /// Replace the current location with `to`. `from` is the location that
    /// was refused, kept so login can send the user back.
    Redirect { to: String, from: Option<String>, replace: bool },
}

impl GuardOutcome {
    fn redirect(to: &str, from: Option<&str>) -> Self {
        Self::Redirect { to: to.to_owned(), from: from.map(str::to_owned), replace: true }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Guard {
    /// Signed-in users only, optionally narrowed by role or permission.
    Protected {
        roles: Option<Vec<String>>,
        permission: Option<String>,
        fallback: String,
    },
    /// Signed-out users only, e.g. the login page.
    Public { redirect: String },
    /// Signed-in users holding one of `roles`.
    RoleGated { roles: Vec<String>, fallback: String },
}

impl Guard {
    #[must_use]
    pub fn protected() -> Self {
        Self::Protected { roles: None, permission: None, fallback: DEFAULT_LOGIN_PATH.to_owned() }
    }

    #[must_use]
    pub fn public() -> Self {
        Self::Public { redirect: DEFAULT_PUBLIC_REDIRECT.to_owned() }
    }

    #[must_use]
    pub fn role_gated<R: AsRef<str>>(roles: &[R]) -> Self {
        Self::RoleGated {
            roles: roles.iter().map(|r| r.as_ref().to_owned()).collect(),
            fallback: UNAUTHORIZED_PATH.to_owned(),
        }
    }

    /// Require one of `roles` (Protected only).
    #[must_use]
    pub fn with_roles<R: AsRef<str>>(mut self, wanted: &[R]) -> Self {
        if let Self::Protected { roles, .. } = &mut self {
            *roles = Some(wanted.iter().map(|r| r.as_ref().to_owned()).collect());
        }
        self
    }

    /// Require `permission` (Protected only).
    #[must_use]
    pub fn with_permission(mut self, wanted: &str) -> Self {
        if let Self::Protected { permission, .. } = &mut self {
            *permission = Some(wanted.to_owned());
        }
        self
    }

    /// Override where the guard sends refused sessions: the login fallback
    /// for Protected, the redirect for Public, the unauthorized fallback for
    /// RoleGated.
    #[must_use]
    pub fn with_fallback(mut self, path: &str) -> Self {
        match &mut self {
            Self::Protected { fallback, .. } | Self::RoleGated { fallback, .. } => *fallback = path.to_owned(),
            Self::Public { redirect } => *redirect = path.to_owned(),
        }
        self
    }

    /// Decide what `location` renders for `session`.
    #[must_use]
    pub fn evaluate(&self, session: &Session, location: &str) -> GuardOutcome {
        if session.is_loading() {
            return GuardOutcome::Loading;
        }
        match self {
            Self::Protected { roles, permission, fallback } => {
                if !session.is_authenticated() {
                    return GuardOutcome::redirect(fallback, Some(location));
                }
                if roles.as_ref().is_some_and(|r| !session.has_role(r)) {
                    return GuardOutcome::redirect(UNAUTHORIZED_PATH, None);
                }
                if permission.as_ref().is_some_and(|p| !session.has_permission(p)) {
                    return GuardOutcome::redirect(UNAUTHORIZED_PATH, None);
                }
                GuardOutcome::Render
            }
            Self::Public { redirect } => {
                if session.is_authenticated() {
                    return GuardOutcome::redirect(redirect, None);
                }
                GuardOutcome::Render
            }
            Self::RoleGated { roles, fallback } => {
                if !session.is_authenticated() {
                    return GuardOutcome::redirect(DEFAULT_LOGIN_PATH, Some(location));
                }
                if !session.has_role(roles) {
                    return GuardOutcome::redirect(fallback, None);
                }
                GuardOutcome::Render
            }
        }
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
