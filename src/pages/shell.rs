//! Terminal rendering of the dashboard shell.
//!
//! [`Shell::open`] resolves a location through the route table, follows guard
//! redirects, and renders the resulting view inside its layout. View rendering
//! runs under the shell's [`ErrorBoundary`]; a failed render shows the
//! fallback until the boundary is reset.

use std::fmt::Write as _;

use super::boundary::{BoundaryState, ErrorBoundary, fallback_text};
use crate::routes::menu::NavigationMenu;
use crate::routes::table::{Layout, Resolution, RouteTable, View};
use crate::state::prefs::{Locale, ThemeMode};
use crate::state::session::Session;

/// Redirect chains longer than this are treated as a routing loop.
pub const MAX_REDIRECTS: usize = 5;

const LOADING_TEXT: &str = "Loading...";

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("the dashboard needs a signed-in profile")]
    MissingProfile,
}

/// A rendered page plus the redirects taken to reach it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Screen {
    pub location: String,
    pub redirects: Vec<String>,
    /// Location a guard refused on the way, for returning after sign-in.
    pub return_to: Option<String>,
    pub body: String,
}

pub struct Shell {
    routes: RouteTable,
    menu: NavigationMenu,
    boundary: ErrorBoundary,
}

impl Shell {
    #[must_use]
    pub fn new(routes: RouteTable, menu: NavigationMenu) -> Self {
        Self { routes, menu, boundary: ErrorBoundary::new() }
    }

    #[must_use]
    pub fn boundary(&self) -> &ErrorBoundary {
        &self.boundary
    }

    /// Render `location` for `session`, following guard redirects.
    pub async fn open(&self, location: &str, session: &Session) -> Screen {
        let mut current = location.to_owned();
        let mut redirects = Vec::new();
        let mut return_to: Option<String> = None;

        loop {
            match self.routes.resolve(&current, session) {
                Resolution::Redirect { to, from, .. } => {
                    if redirects.len() >= MAX_REDIRECTS {
                        tracing::warn!(location, "redirect loop");
                        let body = frame(Layout::Error, &format!("Too many redirects while opening {location}"));
                        return Screen { location: current, redirects, return_to, body };
                    }
                    tracing::debug!(from = %current, to = %to, "guard redirect");
                    if return_to.is_none() {
                        return_to = from;
                    }
                    redirects.push(to.clone());
                    current = to;
                }
                Resolution::Loading { layout } => {
                    let body = frame(layout, LOADING_TEXT);
                    return Screen { location: current, redirects, return_to, body };
                }
                Resolution::Render { layout, view } => {
                    let body = self.render_view(layout, view, &current, return_to.as_deref(), session).await;
                    return Screen { location: current, redirects, return_to, body };
                }
            }
        }
    }

    async fn render_view(
        &self,
        layout: Layout,
        view: View,
        location: &str,
        return_to: Option<&str>,
        session: &Session,
    ) -> String {
        let menu = self.menu.clone();
        let session = session.clone();
        let path = location.to_owned();
        let return_to = return_to.map(str::to_owned);
        let rendered = self
            .boundary
            .run(async move {
                match view {
                    View::Login => Ok(render_login(return_to.as_deref())),
                    View::Dashboard => render_dashboard(&session, &menu, &path),
                    View::NotFound => Ok(render_not_found(&path)),
                    View::Unauthorized => Ok(render_unauthorized()),
                }
            })
            .await;

        match (rendered, self.boundary.state()) {
            (Some(body), _) => frame(layout, &body),
            (None, BoundaryState::Failed(err)) => frame(Layout::Error, &fallback_text(&err, cfg!(debug_assertions))),
            (None, BoundaryState::Healthy) => frame(Layout::Error, "Render aborted"),
        }
    }
}

// =============================================================================
// LAYOUTS
// =============================================================================

fn frame(layout: Layout, body: &str) -> String {
    match layout {
        Layout::Full => format!("{body}\n"),
        Layout::Sidebar => format!("== dashboard ==\n{body}\n"),
        Layout::Error => format!("!! {body}\n"),
    }
}

// =============================================================================
// VIEWS
// =============================================================================

fn render_login(return_to: Option<&str>) -> String {
    let mut out = "Sign in\n  email:    <email>\n  password: <at least 6 characters>\n".to_owned();
    match return_to {
        Some(path) => {
            let _ = write!(out, "Run `dashboard-shell login --email <email> --return-to {path}`.");
        }
        None => out.push_str("Run `dashboard-shell login --email <email>`."),
    }
    out
}

fn render_not_found(path: &str) -> String {
    format!("404 Page not found: {path}")
}

fn render_unauthorized() -> String {
    "403 You do not have access to this page.".to_owned()
}

fn render_dashboard(session: &Session, menu: &NavigationMenu, path: &str) -> Result<String, RenderError> {
    let profile = session.profile().ok_or(RenderError::MissingProfile)?;
    let mut out = format!("Signed in as {} <{}> [{}]\n", profile.name, profile.email, profile.role);
    out.push_str(&render_menu(&menu.visible(session), path));
    Ok(out)
}

/// Indented menu tree; the entry containing `path` is marked with `*`.
#[must_use]
pub fn render_menu(menu: &NavigationMenu, path: &str) -> String {
    let mut out = String::new();
    if menu.is_empty() {
        out.push_str("(no navigation entries)\n");
        return out;
    }
    for item in &menu.main {
        let marker = if item.is_active(path) { '*' } else { ' ' };
        let _ = write!(out, "{marker} {} ({})", item.title, item.url);
        if let Some(badge) = &item.badge {
            let _ = write!(out, " [{badge}]");
        }
        out.push('\n');
        for sub in &item.items {
            let _ = writeln!(out, "    - {} ({})", sub.title, sub.url);
        }
    }
    if !menu.projects.is_empty() {
        out.push_str("Projects\n");
        for project in &menu.projects {
            let _ = writeln!(out, "  # {} ({})", project.name, project.url);
        }
    }
    out
}

// =============================================================================
// STANDALONE SCREENS
// =============================================================================

/// Shown instead of the app when the identity provider is not configured.
#[must_use]
pub fn render_setup_required(missing: &[&str]) -> String {
    let mut out = String::from(
        "Identity provider setup required\n\
         The dashboard needs identity provider configuration before anyone can sign in.\n\
         Add the following to your environment or .env file:\n\n",
    );
    for key in missing {
        let hint = key.trim_start_matches("IDENTITY_").to_ascii_lowercase();
        let _ = writeln!(out, "{key}=your_{hint}_here");
    }
    out
}

#[must_use]
pub fn render_whoami(session: &Session) -> String {
    let Some(profile) = session.profile().filter(|_| session.is_authenticated()) else {
        return match session.error() {
            Some(err) => format!("Not signed in ({})\n", err.message),
            None => "Not signed in\n".to_owned(),
        };
    };
    let mut out = format!(
        "{} <{}>\n  id:          {}\n  role:        {}\n  status:      {:?}\n",
        profile.name, profile.email, profile.id, profile.role, profile.status
    );
    let permissions: Vec<&str> = profile.permissions.iter().map(String::as_str).collect();
    let _ = writeln!(out, "  permissions: {}", if permissions.is_empty() { "-".to_owned() } else { permissions.join(", ") });
    if let Some(identity) = session.identity() {
        let _ = writeln!(out, "  verified:    {}", identity.email_verified);
    }
    if let Some(err) = session.error() {
        let _ = writeln!(out, "  warning:     {}", err.message);
    }
    out
}

#[must_use]
pub fn render_prefs(locale: Locale, theme: ThemeMode) -> String {
    format!("locale: {locale}\ntheme:  {}\n", theme.as_str())
}

#[cfg(test)]
#[path = "shell_test.rs"]
mod tests;
