//! Portal API client

pub mod error;
pub mod groups;
pub mod users;

use error::ClientError;
use portal_access_core::DirectoryConfig;
use reqwest::{Client, ClientBuilder, Method, header};
use std::time::Duration;
use url::Url;

const DEFAULT_USER_AGENT: &str = concat!("portal-access/", env!("CARGO_PKG_VERSION"));

/// Client for the ingestion portal's group and user endpoints
#[derive(Clone)]
pub struct DirectoryClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl std::fmt::Debug for DirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryClient")
            .field("base_url", &self.base_url())
            .field("authenticated", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl DirectoryClient {
    /// Create a new client with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    pub fn builder() -> DirectoryClientBuilder {
        DirectoryClientBuilder::default()
    }

    /// Build a client from the directory section of the console config
    pub fn from_config(config: &DirectoryConfig) -> Result<Self, ClientError> {
        let mut builder = Self::builder()
            .base_url(config.base_url.as_str())
            .timeout(config.timeout());
        if let Some(api_key) = &config.api_key {
            builder = builder.api_key(api_key.as_str());
        }
        builder.build()
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Absolute URL for `segments` below the base URL. Each segment is
    /// percent-encoded on its own.
    pub fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::Configuration(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Create a request builder with authentication
    pub fn request(&self, method: Method, segments: &[&str]) -> Result<reqwest::RequestBuilder, ClientError> {
        let url = self.url(segments)?;
        tracing::debug!(%method, %url, "Portal API request");
        let mut request = self.client.request(method, url);

        if let Some(api_key) = &self.api_key {
            request = request.header(header::AUTHORIZATION, format!("Bearer {api_key}"));
        }

        Ok(request)
    }

    /// Execute a request and decode a JSON body
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = Self::send(request).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Execute a request whose response body carries nothing of interest
    pub async fn execute_empty(&self, request: reqwest::RequestBuilder) -> Result<(), ClientError> {
        Self::send(request).await?;
        Ok(())
    }

    async fn send(request: reqwest::RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            tracing::debug!(status = status.as_u16(), %message, "Portal API error response");
            Err(ClientError::from_status(status, message))
        }
    }
}

/// Builder for [`DirectoryClient`]
#[derive(Default)]
pub struct DirectoryClientBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl DirectoryClientBuilder {
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the bearer token sent with every request
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<DirectoryClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ClientError::Configuration(format!("invalid base_url {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Configuration(format!(
                "{base_url} cannot be a base URL"
            )));
        }

        let mut client_builder = ClientBuilder::new();
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }
        client_builder = client_builder
            .user_agent(self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()));

        let client = client_builder.build()?;

        Ok(DirectoryClient {
            client,
            base_url,
            api_key: self.api_key,
        })
    }
}
