//! Sidebar navigation: main menu entries, their sub-entries, and project
//! shortcuts, each tagged with the capabilities needed to see it.
//!
//! DESIGN
//! ======
//! Menu data is plain JSON (`roles` / `permissions` arrays on any entry).
//! [`NavigationMenu::visible`] is a pure projection: it never mutates the
//! source menu and returns nothing at all for a signed-out session.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::state::session::Session;

#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    #[error("failed to read menu file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid menu definition: {0}")]
    Parse(#[from] serde_json::Error),
}

/// What a session needs to see an entry. Empty means everyone signed in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Any one of these roles.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    /// Every one of these permissions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
}

impl Capabilities {
    #[must_use]
    pub fn allows(&self, session: &Session) -> bool {
        (self.roles.is_empty() || session.has_role(&self.roles))
            && self.permissions.iter().all(|p| session.has_permission(p))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubMenuItem {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub badge: Option<String>,
    #[serde(flatten)]
    pub requires: Capabilities,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub badge: Option<String>,
    #[serde(flatten)]
    pub requires: Capabilities,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<SubMenuItem>,
}

impl MenuItem {
    /// True when `path` is this entry's URL or lies beneath it.
    #[must_use]
    pub fn is_active(&self, path: &str) -> bool {
        is_under(path, &self.url) || self.items.iter().any(|sub| is_under(path, &sub.url))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectItem {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub badge: Option<String>,
    #[serde(flatten)]
    pub requires: Capabilities,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationMenu {
    #[serde(default)]
    pub main: Vec<MenuItem>,
    #[serde(default)]
    pub projects: Vec<ProjectItem>,
}

impl NavigationMenu {
    /// # Errors
    ///
    /// Returns an error if `raw` is not a valid menu definition.
    pub fn from_json(raw: &str) -> Result<Self, MenuError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, MenuError> {
        let raw = std::fs::read_to_string(path).map_err(|source| MenuError::Io { path: path.to_path_buf(), source })?;
        Self::from_json(&raw)
    }

    /// The entries `session` may see, sub-entries filtered too.
    #[must_use]
    pub fn visible(&self, session: &Session) -> NavigationMenu {
        if !session.is_authenticated() {
            return NavigationMenu::default();
        }
        let main = self
            .main
            .iter()
            .filter(|item| item.requires.allows(session))
            .map(|item| MenuItem {
                items: item.items.iter().filter(|sub| sub.requires.allows(session)).cloned().collect(),
                ..item.clone()
            })
            .collect();
        let projects = self.projects.iter().filter(|p| p.requires.allows(session)).cloned().collect();
        NavigationMenu { main, projects }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.main.is_empty() && self.projects.is_empty()
    }
}

fn is_under(path: &str, url: &str) -> bool {
    path == url || path.strip_prefix(url).is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
#[path = "menu_test.rs"]
mod tests;
