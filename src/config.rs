//! Application configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Every knob has a default except the identity-provider credentials, which
//! are optional so the binary can still start and explain what is missing.
//! Parsing goes through a lookup function so tests can feed a map instead of
//! mutating the process environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::state::prefs::{Locale, ThemeMode};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:9000/api";
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";
pub const DEFAULT_HOME_PATH: &str = "/dashboard";
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_IDENTITY_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";
pub const DEFAULT_STATE_DIR_NAME: &str = ".dashboard-shell";

/// Errors produced while parsing configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Identity-provider project settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub api_key: Option<String>,
    pub auth_domain: Option<String>,
    pub project_id: Option<String>,
    pub storage_bucket: Option<String>,
    pub messaging_sender_id: Option<String>,
    pub app_id: Option<String>,
    pub base_url: String,
    pub token_url: String,
}

impl IdentityConfig {
    /// True when the keys required to talk to the provider are all present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.auth_domain.is_some() && self.project_id.is_some() && self.app_id.is_some()
    }

    /// Environment variable names of every unset identity key, in display order.
    #[must_use]
    pub fn missing_keys(&self) -> Vec<&'static str> {
        [
            ("IDENTITY_API_KEY", &self.api_key),
            ("IDENTITY_AUTH_DOMAIN", &self.auth_domain),
            ("IDENTITY_PROJECT_ID", &self.project_id),
            ("IDENTITY_STORAGE_BUCKET", &self.storage_bucket),
            ("IDENTITY_MESSAGING_SENDER_ID", &self.messaging_sender_id),
            ("IDENTITY_APP_ID", &self.app_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name)
        .collect()
    }
}

// =============================================================================
// APP
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_base_url: String,
    pub state_dir: PathBuf,
    pub default_locale: Locale,
    pub default_theme: ThemeMode,
    pub login_path: String,
    pub home_path: String,
    /// Whole-request timeout for HTTP calls. `None` keeps the transport default.
    pub http_timeout: Option<Duration>,
    pub identity: IdentityConfig,
}

impl AppConfig {
    /// Build typed config from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a locale, theme, or timeout value cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build typed config from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a locale, theme, or timeout value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let default_locale = match get("DASHBOARD_LOCALE") {
            Some(raw) => raw
                .parse::<Locale>()
                .map_err(|reason| ConfigError::Invalid { var: "DASHBOARD_LOCALE", reason })?,
            None => Locale::default(),
        };
        let default_theme = match get("DASHBOARD_THEME") {
            Some(raw) => raw
                .parse::<ThemeMode>()
                .map_err(|reason| ConfigError::Invalid { var: "DASHBOARD_THEME", reason })?,
            None => ThemeMode::default(),
        };
        let http_timeout = match get("DASHBOARD_HTTP_TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                var: "DASHBOARD_HTTP_TIMEOUT_SECS",
                reason: e.to_string(),
            })?)),
            None => None,
        };

        let state_dir = get("DASHBOARD_STATE_DIR").map_or_else(
            || default_state_dir(get("HOME").as_deref()),
            PathBuf::from,
        );

        let identity = IdentityConfig {
            api_key: get("IDENTITY_API_KEY"),
            auth_domain: get("IDENTITY_AUTH_DOMAIN"),
            project_id: get("IDENTITY_PROJECT_ID"),
            storage_bucket: get("IDENTITY_STORAGE_BUCKET"),
            messaging_sender_id: get("IDENTITY_MESSAGING_SENDER_ID"),
            app_id: get("IDENTITY_APP_ID"),
            base_url: trim_url(get("IDENTITY_BASE_URL").as_deref().unwrap_or(DEFAULT_IDENTITY_BASE_URL)),
            token_url: trim_url(get("IDENTITY_TOKEN_URL").as_deref().unwrap_or(DEFAULT_IDENTITY_TOKEN_URL)),
        };

        Ok(Self {
            api_base_url: trim_url(get("DASHBOARD_API_BASE_URL").as_deref().unwrap_or(DEFAULT_API_BASE_URL)),
            state_dir,
            default_locale,
            default_theme,
            login_path: get("DASHBOARD_LOGIN_PATH").unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_owned()),
            home_path: get("DASHBOARD_HOME_PATH").unwrap_or_else(|| DEFAULT_HOME_PATH.to_owned()),
            http_timeout,
            identity,
        })
    }
}

fn default_state_dir(home: Option<&str>) -> PathBuf {
    match home {
        Some(home) => PathBuf::from(home).join(DEFAULT_STATE_DIR_NAME),
        None => PathBuf::from(DEFAULT_STATE_DIR_NAME),
    }
}

fn trim_url(raw: &str) -> String {
    raw.trim_end_matches('/').to_owned()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
