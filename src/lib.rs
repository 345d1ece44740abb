//! # dashboard-shell
//!
//! Authentication, session, and navigation-guard layer for a role-aware
//! dashboard. A hosted identity provider issues short-lived bearer tokens, a
//! REST backend turns those tokens into application profiles, and the
//! [`state::controller::SessionController`] keeps the one canonical
//! [`state::session::Session`] that routes, menus, and pages read from.
//!
//! SYSTEM CONTEXT
//! ==============
//! `net` talks to the identity provider and the backend, `util` owns the
//! persisted key-value slots, `state` owns the session state machine and
//! preferences, `routes` decides what a path renders for the current session,
//! and `pages` holds the view layer consumed by the `dashboard-shell` binary.

pub mod config;
pub mod error;
pub mod net;
pub mod pages;
pub mod routes;
pub mod state;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;
