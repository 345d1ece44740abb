//! Backend profile fetcher: bearer token in, application profile out.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use super::api::{ApiClient, RequestAuth};
use super::types::{Profile, UserResponse};
use crate::error::ProfileFetchError;

pub const PROFILE_ENDPOINT: &str = "/auth/me";
pub const SIGN_OUT_ENDPOINT: &str = "/auth/logout";

/// Backend operations the session controller needs.
#[async_trait]
pub trait ProfileBackend: Send + Sync {
    /// Resolve `token` to the application profile it belongs to.
    async fn fetch_profile(&self, token: &str) -> Result<Profile, ProfileFetchError>;

    /// Tell the backend the session identified by `token` is over.
    async fn sign_out(&self, token: &str) -> Result<(), ProfileFetchError>;
}

/// [`ProfileBackend`] over the dashboard REST API.
#[derive(Clone)]
pub struct HttpProfileBackend {
    api: Arc<ApiClient>,
}

impl HttpProfileBackend {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ProfileBackend for HttpProfileBackend {
    async fn fetch_profile(&self, token: &str) -> Result<Profile, ProfileFetchError> {
        let user: UserResponse = self
            .api
            .request::<_, Value>(Method::GET, PROFILE_ENDPOINT, None, RequestAuth::Bearer(token))
            .await?;
        tracing::debug!(user_id = %user.id, role = %user.role, "fetched profile");
        Ok(Profile::from(user))
    }

    async fn sign_out(&self, token: &str) -> Result<(), ProfileFetchError> {
        self.api
            .request::<Value, Value>(Method::POST, SIGN_OUT_ENDPOINT, Some(&Value::Null), RequestAuth::Bearer(token))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "profile_test.rs"]
mod tests;
