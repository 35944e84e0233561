//! Marketplace REST API client.
//!
//! Speaks JSON with camelCase field names. After sign-in every request
//! carries the session token as a bearer header; an optional app key goes
//! out as `X-Api-Key`.
//!
//! # Endpoints
//!
//! - `/auth/sign-in`, `/auth/sign-out`, `/auth/me` - session ([`auth`])
//! - `/shops/me`, `/shops` - shop account ([`shops`])
//! - `/{resource}`, `/{resource}/{id}` - paged collections ([`resources`])
//! - `/redemptions/validate/{code}`, `/redemptions/{id}/confirm` - code lookup ([`redemptions`])

mod auth;
mod conversions;
mod redemptions;
mod resources;
mod shops;
mod types;

pub use resources::{Coupons, MutableResource, Redemptions, Resource};
pub use types::*;

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ApiError, MalformedResponseError};

/// Dashboard REST API client.
///
/// Cheap to clone; clones share the HTTP connection pool and the session
/// token.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: RwLock<Option<SecretString>>,
}

/// Body of a non-success response.
#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));

        if let Some(key) = &config.api_key {
            let mut value = HeaderValue::from_str(key.expose_secret())
                .map_err(|e| ApiError::Transport(format!("Invalid API key format: {e}")))?;
            value.set_sensitive(true);
            headers.insert("X-Api-Key", value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .user_agent(concat!("dealdesk/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_url.clone(),
                token: RwLock::new(None),
            }),
        })
    }

    /// The API base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Whether a session token is held.
    pub async fn has_token(&self) -> bool {
        self.inner.token.read().await.is_some()
    }

    pub(crate) async fn set_token(&self, token: Option<SecretString>) {
        *self.inner.token.write().await = token;
    }

    /// Build an endpoint URL from path segments (each one percent-encoded).
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Transport("API base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.inner.token.read().await.as_ref() {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Execute a GET request.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let request = self.authorize(self.inner.client.get(url.clone())).await;
        let response = request.send().await?;
        Self::handle_response(&url, response).await
    }

    /// Execute a GET request where 404 means "nothing there".
    pub(crate) async fn get_optional<T: DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<Option<T>, ApiError> {
        match self.get::<Option<T>>(url).await {
            Err(e) if e.is_not_found() => Ok(None),
            other => other,
        }
    }

    /// Execute a POST request with a JSON body.
    pub(crate) async fn post<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.authorize(self.inner.client.post(url.clone())).await;
        let response = request.json(body).send().await?;
        Self::handle_response(&url, response).await
    }

    /// Execute a POST request without a body, ignoring the response body.
    pub(crate) async fn post_empty(&self, url: Url) -> Result<(), ApiError> {
        let request = self.authorize(self.inner.client.post(url)).await;
        let response = request.send().await?;
        Self::expect_success(response).await
    }

    /// Execute a PATCH request with a JSON body.
    pub(crate) async fn patch<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.authorize(self.inner.client.patch(url.clone())).await;
        let response = request.json(body).send().await?;
        Self::handle_response(&url, response).await
    }

    /// Execute a DELETE request.
    pub(crate) async fn delete(&self, url: Url) -> Result<(), ApiError> {
        let request = self.authorize(self.inner.client.delete(url)).await;
        let response = request.send().await?;
        Self::expect_success(response).await
    }

    async fn expect_success(response: reqwest::Response) -> Result<(), ApiError> {
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::parse_error(response).await)
    }

    /// Handle API response and parse JSON.
    async fn handle_response<T: DeserializeOwned>(
        url: &Url,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();

        if !status.is_success() {
            return Err(Self::parse_error(response).await);
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| {
            tracing::error!(
                url = %url,
                error = %e,
                body = %String::from_utf8_lossy(&body).chars().take(500).collect::<String>(),
                "Failed to parse API response"
            );
            MalformedResponseError::new(url.path(), "body", e.to_string()).into()
        })
    }

    /// Parse error response from the API.
    async fn parse_error(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();

        // Check for rate limiting
        if status == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(60);
            return ApiError::RateLimited(retry_after);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.message.or(body.error))
            .unwrap_or_else(|| {
                if text.trim().is_empty() {
                    format!("HTTP {status}")
                } else {
                    text.chars().take(200).collect()
                }
            });

        if status == 401 || status == 403 {
            return ApiError::Unauthorized(message);
        }

        ApiError::Status { status, message }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}
