//! Route table: maps a location to a layout, a view, and the guard in front
//! of it.

use super::guard::{Guard, GuardOutcome, UNAUTHORIZED_PATH};
use crate::state::session::Session;

/// Page chrome a view is rendered inside.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    /// Bare full-screen page (login).
    Full,
    /// Navigation sidebar plus content.
    Sidebar,
    /// Centered error page.
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    Login,
    Dashboard,
    NotFound,
    Unauthorized,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub layout: Layout,
    pub view: View,
    pub guard: Option<Guard>,
}

impl Route {
    #[must_use]
    pub fn new(path: &str, layout: Layout, view: View) -> Self {
        Self { path: normalize(path).to_owned(), layout, view, guard: None }
    }

    #[must_use]
    pub fn guarded(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The guard is waiting on the session; show a spinner in `layout`.
    Loading { layout: Layout },
    Render { layout: Layout, view: View },
    Redirect { to: String, from: Option<String>, replace: bool },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Login at `/` and `login_path`, the sidebar shell at `home_path`, and
    /// the unauthorized page.
    #[must_use]
    pub fn standard(login_path: &str, home_path: &str) -> Self {
        let public = Guard::public().with_fallback(home_path);
        Self::new()
            .with_route(Route::new("/", Layout::Full, View::Login).guarded(public.clone()))
            .with_route(Route::new(login_path, Layout::Full, View::Login).guarded(public))
            .with_route(
                Route::new(home_path, Layout::Sidebar, View::Dashboard)
                    .guarded(Guard::protected().with_fallback(login_path)),
            )
            .with_route(Route::new(UNAUTHORIZED_PATH, Layout::Error, View::Unauthorized))
    }

    /// Add a route. Later routes with the same path shadow earlier ones.
    #[must_use]
    pub fn with_route(mut self, route: Route) -> Self {
        self.routes.retain(|r| r.path != route.path);
        self.routes.push(route);
        self
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    #[must_use]
    pub fn find(&self, location: &str) -> Option<&Route> {
        let path = normalize(location);
        self.routes.iter().find(|r| r.path == path)
    }

    /// What `location` shows for `session`. Unknown paths render the
    /// not-found view in the error layout.
    #[must_use]
    pub fn resolve(&self, location: &str, session: &Session) -> Resolution {
        let Some(route) = self.find(location) else {
            return Resolution::Render { layout: Layout::Error, view: View::NotFound };
        };
        let outcome = route.guard.as_ref().map_or(GuardOutcome::Render, |g| g.evaluate(session, location));
        match outcome {
            GuardOutcome::Loading => Resolution::Loading { layout: route.layout },
            GuardOutcome::Render => Resolution::Render { layout: route.layout, view: route.view },
            GuardOutcome::Redirect { to, from, replace } => Resolution::Redirect { to, from, replace },
        }
    }
}

/// Strip query and fragment, and any trailing slash except on the root.
fn normalize(location: &str) -> &str {
    let end = location.find(['?', '#']).unwrap_or(location.len());
    let path = &location[..end];
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

#[cfg(test)]
#[path = "table_test.rs"]
mod tests;
