//! Authentication error taxonomy and user-facing message mapping.
//!
//! DESIGN
//! ======
//! `IdentityError` and `ProfileFetchError` keep their sources typed. Anything
//! that reaches the login form is reduced to an [`AuthError`] (`message` plus
//! an optional provider code) and then mapped to display text through a fixed
//! code table, falling back to substring heuristics on the raw message.

use crate::net::api::ApiError;

/// Generic text used when nothing better is known.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

/// Code attached to a login whose result was discarded because a newer
/// session operation started while it was in flight.
pub const SUPERSEDED_CODE: &str = "session/superseded";

/// Code used for transport failures reaching the identity provider.
pub const NETWORK_FAILURE_CODE: &str = "auth/network-request-failed";

// =============================================================================
// SOURCE ERRORS
// =============================================================================

/// Failures from the identity provider.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The provider answered and refused. `code` is an `auth/*` code.
    #[error("{message}")]
    Rejected { code: String, message: String },

    /// The provider could not be reached or answered garbage.
    #[error("identity provider unreachable: {0}")]
    Transport(String),

    /// No API key is configured for the provider.
    #[error("identity provider is not configured")]
    NotConfigured,

    /// The provider session could not be persisted locally.
    #[error("identity session storage failed: {0}")]
    Storage(String),
}

impl IdentityError {
    /// Provider code for this failure, when one applies.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Rejected { code, .. } => Some(code),
            Self::Transport(_) => Some(NETWORK_FAILURE_CODE),
            Self::NotConfigured => Some("auth/invalid-api-key"),
            Self::Storage(_) => None,
        }
    }
}

/// Failure to turn a token into a backend profile.
#[derive(Debug, thiserror::Error)]
#[error("profile fetch failed: {0}")]
pub struct ProfileFetchError(#[from] pub ApiError);

impl ProfileFetchError {
    /// True when the backend refused the token itself.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.0, ApiError::Unauthorized)
    }
}

// =============================================================================
// NORMALISED ERROR
// =============================================================================

/// Normalised authentication failure shown to the user.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AuthError {
    pub message: String,
    pub code: Option<String>,
}

impl AuthError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), code: None }
    }

    #[must_use]
    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self { message: message.into(), code: Some(code.into()) }
    }

    #[must_use]
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_ERROR_MESSAGE)
    }

    #[must_use]
    pub fn superseded() -> Self {
        Self::with_code("Login was superseded by a newer session change", SUPERSEDED_CODE)
    }
}

impl From<IdentityError> for AuthError {
    fn from(err: IdentityError) -> Self {
        let code = err.code().map(str::to_owned);
        let message = match &err {
            IdentityError::Rejected { message, .. } if !message.is_empty() => message.clone(),
            IdentityError::Rejected { .. } => UNKNOWN_ERROR_MESSAGE.to_owned(),
            other => other.to_string(),
        };
        Self { message, code }
    }
}

impl From<ProfileFetchError> for AuthError {
    fn from(err: ProfileFetchError) -> Self {
        match err.0 {
            ApiError::Status { message, code, .. } => Self {
                message: message.unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_owned()),
                code,
            },
            ApiError::Unauthorized => Self::new("Unauthorized"),
            other => Self::new(other.to_string()),
        }
    }
}

impl From<String> for AuthError {
    fn from(message: String) -> Self {
        if message.is_empty() { Self::unknown() } else { Self::new(message) }
    }
}

impl From<&str> for AuthError {
    fn from(message: &str) -> Self {
        Self::from(message.to_owned())
    }
}

// =============================================================================
// USER-FACING MESSAGES
// =============================================================================

/// Fixed provider-code table.
pub const PROVIDER_MESSAGES: &[(&str, &str)] = &[
    ("auth/user-not-found", "No account found with this email"),
    ("auth/wrong-password", "Incorrect password"),
    ("auth/invalid-email", "Invalid email address"),
    ("auth/user-disabled", "Account has been disabled"),
    ("auth/email-already-in-use", "This email is already in use"),
    ("auth/weak-password", "Password is too weak. Please choose a stronger password"),
    ("auth/invalid-credential", "Invalid credentials"),
    ("auth/too-many-requests", "Too many attempts. Please try again in a few minutes"),
    ("auth/operation-not-allowed", "This sign-in method is not enabled"),
    ("auth/network-request-failed", "Network connection error. Please check your internet connection"),
    ("auth/timeout", "Connection timed out. Please try again"),
    ("auth/invalid-api-key", "Invalid system configuration"),
    ("auth/app-deleted", "Application has been deleted"),
    ("auth/app-not-authorized", "Application is not authorized"),
    ("auth/multi-factor-auth-required", "Two-factor authentication required"),
    ("auth/maximum-second-factor-count-exceeded", "Maximum authentication factors exceeded"),
];

fn provider_message(code: &str) -> Option<&'static str> {
    PROVIDER_MESSAGES.iter().find(|(c, _)| *c == code).map(|(_, m)| *m)
}

/// Pull `auth/<code>` out of a message like `"Provider: Error (auth/<code>)."`.
fn embedded_code(message: &str) -> Option<String> {
    let start = message.find("(auth/")? + 1;
    let rest = &message[start..];
    let end = rest.find(')')?;
    Some(rest[..end].to_owned())
}

/// Display text for an authentication failure.
#[must_use]
pub fn friendly_message(err: &AuthError) -> String {
    if let Some(mapped) = err.code.as_deref().and_then(provider_message) {
        return mapped.to_owned();
    }

    let message = err.message.as_str();
    if let Some(mapped) = embedded_code(message).as_deref().and_then(provider_message) {
        return mapped.to_owned();
    }

    let lower = message.to_lowercase();
    if lower.contains("password") {
        return "Incorrect password".to_owned();
    }
    if lower.contains("email") {
        return "There is an issue with the email address".to_owned();
    }
    if lower.contains("network") || lower.contains("connection") {
        return "Network connection error. Please try again".to_owned();
    }

    if message.is_empty() {
        "An unknown error occurred. Please try again".to_owned()
    } else {
        message.to_owned()
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
