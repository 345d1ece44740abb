//! Error boundary around view rendering.
//!
//! Each render runs in its own task. An `Err` result or a panic is captured,
//! logged, and latched: the boundary stays `Failed` (and callers show the
//! fallback) until [`ErrorBoundary::reset`] is called.

use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

pub const FALLBACK_TITLE: &str = "Oops! Something went wrong";
pub const FALLBACK_HINT: &str = "The application hit an unexpected error. Try again, or go back to the home page.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedError {
    pub message: String,
    pub panicked: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BoundaryState {
    #[default]
    Healthy,
    Failed(CapturedError),
}

#[derive(Debug, Default)]
pub struct ErrorBoundary {
    state: Mutex<BoundaryState>,
}

impl ErrorBoundary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> BoundaryState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.state(), BoundaryState::Failed(_))
    }

    /// Leave the failed state so the next render is attempted again.
    pub fn reset(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = BoundaryState::Healthy;
    }

    /// Run `render`. Returns `None` when the render failed now or an earlier
    /// failure has not been reset.
    pub async fn run<F, T, E>(&self, render: F) -> Option<T>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        if self.is_failed() {
            return None;
        }
        let captured = match tokio::spawn(render).await {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(e)) => CapturedError { message: e.to_string(), panicked: false },
            Err(join) if join.is_panic() => CapturedError { message: panic_message(join.into_panic().as_ref()), panicked: true },
            Err(join) => CapturedError { message: join.to_string(), panicked: false },
        };
        tracing::error!(error = %captured.message, panicked = captured.panicked, "render failed");
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = BoundaryState::Failed(captured);
        None
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

/// Text shown in place of a failed view.
#[must_use]
pub fn fallback_text(error: &CapturedError, show_details: bool) -> String {
    let mut out = format!("{FALLBACK_TITLE}\n{FALLBACK_HINT}\n");
    if show_details {
        out.push_str(&format!("\nDetails: {}\n", error.message));
    }
    out
}

#[cfg(test)]
#[path = "boundary_test.rs"]
mod tests;
