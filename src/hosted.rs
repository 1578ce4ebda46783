//! Shared HTTP client for the hosted backend-as-a-service platform.
//!
//! Both the storage REST API and the database REST API live under one
//! project URL and authenticate with the same service key.

use anyhow::{Context, Result};
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use url::Url;

use crate::reliability::RetryConfig;

/// Connection settings for the hosted backend.
#[derive(Clone)]
pub struct HostedClient {
    client: reqwest::Client,
    base_url: Url,
    service_key: String,
    retry: RetryConfig,
}

impl std::fmt::Debug for HostedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedClient")
            .field("base_url", &self.base_url.as_str())
            .field("service_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl HostedClient {
    /// Creates a client for the project at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not an absolute http(s) URL or the
    /// HTTP client cannot be built.
    pub fn new(base_url: &str, service_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("Invalid backend URL: {base_url}"))?;

        if !matches!(base_url.scheme(), "http" | "https") {
            anyhow::bail!("Backend URL must use http or https (got: {base_url})");
        }

        // Url::join replaces the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            service_key: service_key.into(),
            retry: RetryConfig::hosted(),
        })
    }

    /// Overrides the retry policy used for every request.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves `path` (no leading slash) against the project URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> std::result::Result<Url, url::ParseError> {
        self.base_url.join(path)
    }

    pub fn get(&self, url: Url) -> RequestBuilder {
        self.authorize(self.client.get(url))
    }

    pub fn post(&self, url: Url) -> RequestBuilder {
        self.authorize(self.client.post(url))
    }

    pub fn delete(&self, url: Url) -> RequestBuilder {
        self.authorize(self.client.delete(url))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
    }
}

/// Classification of a failed response, shared by both REST backends.
pub(crate) enum ResponseFailure {
    Unauthorized(String),
    Status { status: u16, body: String },
}

/// Splits a response into success or a classified failure with its body.
pub(crate) async fn check_status(
    response: Response,
) -> std::result::Result<Response, ResponseFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(ResponseFailure::Unauthorized(format!("HTTP {status}: {body}")));
    }
    Err(ResponseFailure::Status {
        status: status.as_u16(),
        body,
    })
}
