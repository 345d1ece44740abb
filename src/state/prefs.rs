//! Locale and theme-mode preferences.
//!
//! Reads the stored choice first and falls back to the configured default.
//! Changes are written back immediately so the next start sees them.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::util::storage::KeyValueStore;

pub const LOCALE_STORAGE_KEY: &str = "lang";
pub const THEME_STORAGE_KEY: &str = "themeMode";

/// UI language.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Locale {
    En,
    #[default]
    Vi,
}

impl Locale {
    pub const ALL: [Self; 2] = [Self::En, Self::Vi];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Vi => "vi",
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "vi" => Ok(Self::Vi),
            other => Err(format!("unsupported locale '{other}' (expected 'en' or 'vi')")),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Colour scheme preference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
    /// Follow the host's preference.
    System,
}

impl ThemeMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }

    /// Flip between light and dark. `System` resolves to dark.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light | Self::System => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl FromStr for ThemeMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" => Ok(Self::System),
            other => Err(format!("unsupported theme mode '{other}' (expected 'light', 'dark' or 'system')")),
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PREFERENCES
// =============================================================================

/// Persisted app-wide preferences.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
    default_locale: Locale,
    default_theme: ThemeMode,
}

impl Preferences {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, default_locale: Locale, default_theme: ThemeMode) -> Self {
        Self { store, default_locale, default_theme }
    }

    /// Active locale. Unrecognised stored values fall back to the default.
    #[must_use]
    pub fn locale(&self) -> Locale {
        self.store
            .get(LOCALE_STORAGE_KEY)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(self.default_locale)
    }

    /// Active theme mode. Unrecognised stored values fall back to the default.
    #[must_use]
    pub fn theme(&self) -> ThemeMode {
        self.store
            .get(THEME_STORAGE_KEY)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(self.default_theme)
    }

    pub fn change_language(&self, locale: Locale) {
        if let Err(e) = self.store.set(LOCALE_STORAGE_KEY, locale.as_str()) {
            tracing::warn!(error = %e, %locale, "failed to persist locale");
        }
    }

    pub fn change_theme_mode(&self, mode: ThemeMode) {
        if let Err(e) = self.store.set(THEME_STORAGE_KEY, mode.as_str()) {
            tracing::warn!(error = %e, %mode, "failed to persist theme mode");
        }
    }

    /// Toggle between light and dark and persist the result.
    pub fn toggle_theme(&self) -> ThemeMode {
        let next = self.theme().toggled();
        self.change_theme_mode(next);
        next
    }
}

#[cfg(test)]
#[path = "prefs_test.rs"]
mod tests;
