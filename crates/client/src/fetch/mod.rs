//! Network boundary.
//!
//! ### Network trait
//! - The router, bootstrap loader and host only see `Network`, so tests can
//!   count calls and simulate connectivity loss.
//! - A `NetworkError` means no response was obtainable at all. Error
//!   statuses (404, 500) are responses, not errors.
//!
//! ### HTTP implementation
//! - reqwest with rustls, transparent decompression, bounded redirects.
//! - Bodies are read fully before returning so they can be forked.
//! - Responses whose final URL left the page origin are classified `cors`,
//!   everything else `basic`.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::{Duration, Instant};

pub use self::url::{UrlError, canonicalize, is_same_origin};

use crate::request::InterceptedRequest;
use crate::response::Response;
use waystation_core::{AppConfig, ResponseType};

/// Failure to obtain any response from the network.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NetworkError::Timeout
        } else if err.is_connect() {
            NetworkError::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            NetworkError::Body(err.to_string())
        } else {
            NetworkError::Other(err.to_string())
        }
    }
}

impl From<NetworkError> for waystation_core::Error {
    fn from(err: NetworkError) -> Self {
        waystation_core::Error::Network(err.to_string())
    }
}

/// Anything that can turn a request into a response.
#[async_trait]
pub trait Network: Send + Sync {
    /// Issue the request, returning the materialized response.
    async fn fetch(&self, request: &InterceptedRequest) -> Result<Response, NetworkError>;
}

/// Configuration for the HTTP network client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Page origin used to classify responses.
    pub origin: ::url::Url,

    /// User agent string (default: "waystation/0.1")
    pub user_agent: String,

    /// Request timeout; None waits indefinitely.
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 20)
    pub max_redirects: usize,
}

impl FetchConfig {
    pub fn new(origin: ::url::Url) -> Self {
        Self { origin, user_agent: "waystation/0.1".to_string(), timeout: None, max_redirects: 20 }
    }

    /// Build from application config.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, waystation_core::Error> {
        let origin = config
            .origin_url()
            .map_err(|e| waystation_core::Error::InvalidUrl(e.to_string()))?;
        Ok(Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), ..Self::new(origin) })
    }
}

/// reqwest-backed `Network`.
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new network client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, waystation_core::Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| waystation_core::Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn classify(&self, final_url: &::url::Url) -> ResponseType {
        if is_same_origin(final_url, &self.config.origin) { ResponseType::Basic } else { ResponseType::Cors }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<Response, NetworkError> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.as_str())
            .headers(request.headers.clone())
            .send()
            .await?;

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let body: Bytes = response.bytes().await?;

        tracing::debug!(
            "fetched {} {} -> {} {} in {}ms ({} bytes)",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        let response_type = self.classify(&final_url);
        Ok(Response { url: final_url, status, headers, body, response_type })
    }
}
