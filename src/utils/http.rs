// src/utils/http.rs

//! HTTP transport with per-attempt timeout and exponential backoff.
//!
//! Every outbound request of the resolvers goes through
//! [`fetch_with_retry`]. Any HTTP response, whatever its status, ends the
//! retry loop: interpreting a 404 or a 500 is the caller's job. Only
//! timeouts and transport faults are retried.

use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::error::Result;
use crate::models::{FailureKind, HttpConfig};

/// HTTP method subset used by the resolvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// An outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// POST with a JSON body and matching content type.
    pub fn post_json(url: impl Into<String>, body: &serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(body.to_string()),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A received response, body already read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into [`TransportError::Status`].
    pub fn error_for_status(self, url: &str) -> std::result::Result<Self, TransportError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(TransportError::Status {
                url: url.to_string(),
                status: self.status,
            })
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }

    pub fn html(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

/// Failure of a request after all attempts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timeout after {}ms: {url}", .after.as_millis())]
    Timeout { url: String, after: Duration },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid response from {url}: {message}")]
    Invalid { url: String, message: String },
}

impl TransportError {
    /// Failure class used for outcome reporting.
    pub fn kind(&self) -> FailureKind {
        match self {
            TransportError::Timeout { .. } => FailureKind::Timeout,
            TransportError::Network { .. } => FailureKind::Network,
            TransportError::Status { .. } | TransportError::Invalid { .. } => FailureKind::Api,
        }
    }

    fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        let url = url.to_string();
        if error.is_timeout() {
            TransportError::Timeout {
                url,
                after: Duration::ZERO,
            }
        } else if error.is_connect() || error.is_request() || error.is_body() {
            TransportError::Network {
                url,
                message: error.to_string(),
            }
        } else {
            TransportError::Invalid {
                url,
                message: error.to_string(),
            }
        }
    }
}

/// Anything that can send a single HTTP request.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError>;
}

/// Production transport backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&request.url, e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(&request.url, e))?;

        Ok(HttpResponse { status, body })
    }
}

/// Create a configured asynchronous HTTP client.
///
/// No client-wide timeout is set; [`fetch_with_retry`] bounds each attempt.
pub fn create_async_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .build()?;
    Ok(client)
}

/// Attempt budget for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first
    pub max_retries: u32,
    /// Bound on each attempt
    pub timeout: Duration,
    /// Sleep before retry `i` is `backoff_base * 2^i`
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, timeout: Duration) -> Self {
        Self {
            max_retries,
            timeout,
            backoff_base: Duration::from_secs(1),
        }
    }

    /// Policy for a platform with the given per-attempt timeout.
    pub fn from_config(config: &HttpConfig, timeout_ms: u64) -> Self {
        Self {
            max_retries: config.max_retries,
            timeout: Duration::from_millis(timeout_ms),
            backoff_base: Duration::from_millis(config.backoff_base_ms),
        }
    }

    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    /// Delay after failed attempt `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Send a request, retrying timeouts and transport faults.
///
/// Returns the first HTTP response received, or the last failure once
/// `max_retries + 1` attempts have been spent.
pub async fn fetch_with_retry(
    transport: &dyn HttpTransport,
    request: &HttpRequest,
    policy: &RetryPolicy,
) -> std::result::Result<HttpResponse, TransportError> {
    let mut attempt = 0;
    loop {
        let error = match tokio::time::timeout(policy.timeout, transport.send(request)).await {
            Ok(Ok(response)) => return Ok(response),
            Ok(Err(TransportError::Timeout { url, .. })) => TransportError::Timeout {
                url,
                after: policy.timeout,
            },
            Ok(Err(error)) => error,
            Err(_) => TransportError::Timeout {
                url: request.url.clone(),
                after: policy.timeout,
            },
        };

        if attempt >= policy.max_retries {
            return Err(error);
        }

        let delay = policy.backoff(attempt);
        log::debug!(
            "Attempt {} for {} failed ({}); retrying in {:?}",
            attempt + 1,
            request.url,
            error,
            delay
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
