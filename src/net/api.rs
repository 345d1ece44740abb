//! REST client for the dashboard backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every authenticated backend call goes through [`ApiClient`], so a 401 from
//! any endpoint has the same effect: the credential slot is cleared and the
//! unauthorized hook (wired to a hard redirect to the login path) fires.
//!
//! ERROR HANDLING
//! ==============
//! Non-success bodies are read as `{message, code}` when possible. Success
//! bodies wrapped in a `{data: ...}` envelope are unwrapped before decoding.
//! Empty bodies decode as JSON `null`, which lets `()` responses through.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::util::credentials::CredentialStore;

const DEFAULT_ERROR_MESSAGE: &str = "An error occurred";

/// Errors produced by backend requests.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The backend answered 401; the stored token has been cleared.
    #[error("Unauthorized")]
    Unauthorized,

    /// The backend answered with another non-success status.
    #[error("{}", message.as_deref().unwrap_or(DEFAULT_ERROR_MESSAGE))]
    Status { status: u16, message: Option<String>, code: Option<String> },

    /// The request never produced a response.
    #[error("Network error: {0}")]
    Transport(String),

    /// The response body did not match the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

/// Which bearer token, if any, to attach to a request.
#[derive(Clone, Copy, Debug, Default)]
pub enum RequestAuth<'a> {
    /// Use whatever the credential store holds (nothing if empty).
    #[default]
    Stored,
    /// Use this token regardless of the store.
    Bearer(&'a str),
    /// Send no `Authorization` header.
    Anonymous,
}

/// Callback fired after a 401 has cleared the credential store.
pub type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
    code: Option<String>,
}

/// Backend HTTP client bound to one base URL and one credential slot.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: CredentialStore,
    on_unauthorized: Option<UnauthorizedHook>,
}

impl ApiClient {
    /// Build a client for `base_url` (e.g. `http://localhost:9000/api`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, credentials: CredentialStore, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            credentials,
            on_unauthorized: None,
        })
    }

    /// Register the callback fired on any 401 response.
    #[must_use]
    pub fn with_unauthorized_hook(mut self, hook: UnauthorizedHook) -> Self {
        self.on_unauthorized = Some(hook);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    /// Send a request and decode the (envelope-unwrapped) JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] on 401 (after clearing the stored
    /// token), [`ApiError::Status`] on other non-success statuses, and
    /// transport/decode errors otherwise.
    pub async fn request<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
        auth: RequestAuth<'_>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut req = self.http.request(method.clone(), self.url(endpoint));
        let token = match auth {
            RequestAuth::Stored => self.credentials.get(),
            RequestAuth::Bearer(token) => Some(token.to_owned()),
            RequestAuth::Anonymous => None,
        };
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        self.handle_response(&method, endpoint, resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        method: &Method,
        endpoint: &str,
        resp: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(%method, endpoint, "backend rejected credentials; clearing stored token");
            if let Some(hook) = &self.on_unauthorized {
                hook();
            }
            self.credentials.clear();
            return Err(ApiError::Unauthorized);
        }

        let raw = resp.text().await.map_err(|e| ApiError::Transport(e.to_string()))?;

        if !status.is_success() {
            let body: Option<ErrorBody> = serde_json::from_str(&raw).ok();
            let (message, code) = body.map_or((None, None), |b| (b.message, b.code));
            tracing::debug!(%method, endpoint, status = status.as_u16(), "backend request failed");
            return Err(ApiError::Status { status: status.as_u16(), message, code });
        }

        let json = if raw.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str::<Value>(&raw).map_err(|e| ApiError::Decode(e.to_string()))?
        };
        serde_json::from_value(unwrap_envelope(json)).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// `GET` with the stored token.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request::<T, Value>(Method::GET, endpoint, None, RequestAuth::Stored).await
    }

    /// `POST` a JSON body with the stored token.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<T, ApiError> {
        self.request(Method::POST, endpoint, Some(body), RequestAuth::Stored).await
    }

    /// `PUT` a JSON body with the stored token.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<T, ApiError> {
        self.request(Method::PUT, endpoint, Some(body), RequestAuth::Stored).await
    }

    /// `PATCH` a JSON body with the stored token.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::PATCH, endpoint, Some(body), RequestAuth::Stored).await
    }

    /// `DELETE` with the stored token.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request::<T, Value>(Method::DELETE, endpoint, None, RequestAuth::Stored).await
    }
}

/// Strip a `{data: ...}` envelope if present.
fn unwrap_envelope(json: Value) -> Value {
    match json {
        Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
        other => other,
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
