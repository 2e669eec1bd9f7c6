//! Type-safe API clients that enforce authentication requirements at compile time

use super::ClientError;
use reqwest::{Client, ClientBuilder, header};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Backend address of a local development deployment
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/api";

const DEFAULT_USER_AGENT: &str = concat!("sportclub-client/", env!("CARGO_PKG_VERSION"));

/// Client for public endpoints that don't require authentication
#[derive(Clone, Debug)]
pub struct PublicClubClient {
    client: Client,
    base_url: String,
}

/// Client for endpoints that require a bearer token
#[derive(Clone, Debug)]
pub struct AuthenticatedClubClient {
    client: Client,
    base_url: String,
    token: String,
}

impl PublicClubClient {
    /// Create a new public client
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        TypedClientBuilder::new().base_url(base_url).build_public()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a request builder without authentication
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, url)
    }

    /// Create a request builder carrying an explicit bearer credential.
    ///
    /// Used for the refresh exchange, which authenticates with the refresh
    /// token rather than the access token.
    pub fn request_with_bearer(
        &self,
        method: reqwest::Method,
        path: &str,
        bearer: &str,
    ) -> reqwest::RequestBuilder {
        self.request(method, path)
            .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
    }

    /// Execute a request and handle common errors
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        execute(request).await
    }

    /// Attach an access token to get an authenticated client
    pub fn authenticate(self, token: impl Into<String>) -> AuthenticatedClubClient {
        AuthenticatedClubClient {
            client: self.client,
            base_url: self.base_url,
            token: token.into(),
        }
    }

    /// Authenticated client sharing this client's connection pool
    pub fn with_token(&self, token: impl Into<String>) -> AuthenticatedClubClient {
        self.clone().authenticate(token)
    }
}

impl AuthenticatedClubClient {
    /// Create a new authenticated client
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ClientError> {
        TypedClientBuilder::new()
            .base_url(base_url)
            .build_authenticated(token)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a request builder with authentication
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
    }

    /// Execute a request and handle common errors
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        execute(request).await
    }

    /// Create a public client (useful for calling public endpoints)
    pub fn to_public(&self) -> PublicClubClient {
        PublicClubClient {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

async fn execute<T: serde::de::DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, ClientError> {
    let response = request.send().await?;
    let status = response.status();
    debug!(url = %response.url(), %status, "Backend responded");

    if status.is_success() {
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    } else {
        let message = response.text().await.unwrap_or_default();
        Err(ClientError::from_status(status, message))
    }
}

/// Type-safe builder that creates the appropriate client type
#[derive(Debug, Default)]
pub struct TypedClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl TypedClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build a public client
    pub fn build_public(self) -> Result<PublicClubClient, ClientError> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))
            .and_then(normalize_base_url)?;

        let mut builder =
            ClientBuilder::new().user_agent(self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT));
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(PublicClubClient {
            client: builder.build()?,
            base_url,
        })
    }

    /// Build an authenticated client
    pub fn build_authenticated(
        self,
        token: impl Into<String>,
    ) -> Result<AuthenticatedClubClient, ClientError> {
        Ok(self.build_public()?.authenticate(token))
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ClientError> {
    let parsed = Url::parse(raw)
        .map_err(|e| ClientError::Configuration(format!("invalid base_url {raw:?}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ClientError::Configuration(format!(
            "base_url must be http or https, got {}",
            parsed.scheme()
        )));
    }
    // Paths are appended verbatim, so the base must not end in a slash
    Ok(raw.trim_end_matches('/').to_string())
}
