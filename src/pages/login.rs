//! Login page view-model: form validation, submission, and what happens next.
//!
//! Validation is pure so the terminal front end and tests can share it.
//! Submission goes through the session controller; the view-model only adds
//! the user-facing parts (error notice, navigation to the home path).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::friendly_message;
use crate::state::controller::SessionController;
use crate::state::events::{Navigation, NoticeLevel, Outbox};

pub const MIN_PASSWORD_LEN: usize = 6;

pub const INVALID_EMAIL_MESSAGE: &str = "Invalid email address";
pub const SHORT_PASSWORD_MESSAGE: &str = "Password must be at least 6 characters";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginField {
    Email,
    Password,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: LoginField,
    pub message: &'static str,
}

/// Raw form input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into() }
    }

    /// Trimmed email and untouched password, or every field error found.
    ///
    /// # Errors
    ///
    /// Returns one [`FieldError`] per invalid field.
    pub fn validate(&self) -> Result<(String, String), Vec<FieldError>> {
        let email = self.email.trim();
        let mut errors = Vec::new();
        if !is_valid_email(email) {
            errors.push(FieldError { field: LoginField::Email, message: INVALID_EMAIL_MESSAGE });
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(FieldError { field: LoginField::Password, message: SHORT_PASSWORD_MESSAGE });
        }
        if errors.is_empty() { Ok((email.to_owned(), self.password.clone())) } else { Err(errors) }
    }
}

/// `local@domain.tld` with no whitespace and exactly one `@`.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && !tld.is_empty() && !domain.starts_with('.') && !domain.contains("..")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The form did not validate; nothing was sent.
    Invalid(Vec<FieldError>),
    /// A previous submission is still running.
    Busy,
    /// Signed in; navigation to `to` was requested.
    SignedIn { to: String },
    /// Sign-in failed; `message` was pushed as an error notice.
    Failed { message: String },
}

pub struct LoginViewModel {
    controller: Arc<SessionController>,
    outbox: Outbox,
    home_path: String,
    busy: AtomicBool,
}

impl LoginViewModel {
    #[must_use]
    pub fn new(controller: Arc<SessionController>, outbox: Outbox, home_path: impl Into<String>) -> Self {
        Self { controller, outbox, home_path: home_path.into(), busy: AtomicBool::new(false) }
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Validate and submit. On success, go to `return_to` (the location a
    /// guard refused) or the home path.
    pub async fn handle_login(&self, form: &LoginForm, return_to: Option<&str>) -> LoginOutcome {
        let (email, password) = match form.validate() {
            Ok(valid) => valid,
            Err(errors) => return LoginOutcome::Invalid(errors),
        };
        if self.busy.swap(true, Ordering::SeqCst) {
            return LoginOutcome::Busy;
        }

        let result = self.controller.login(&email, &password).await;
        self.busy.store(false, Ordering::SeqCst);

        match result {
            Ok(()) => {
                let to = return_to.filter(|p| p.starts_with('/')).unwrap_or(&self.home_path).to_owned();
                self.outbox.navigate(Navigation::Soft { to: to.clone(), from: None, replace: true });
                LoginOutcome::SignedIn { to }
            }
            Err(err) => {
                let message = friendly_message(&err);
                self.outbox.notify(NoticeLevel::Error, message.clone());
                LoginOutcome::Failed { message }
            }
        }
    }
}

#[cfg(test)]
#[path = "login_test.rs"]
mod tests;
