use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// What came back from the remote end of a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status_code: u16,
    /// Decoded body text, `None` when it could not be read or decoded
    pub body: Option<String>,
}

impl HttpResponse {
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self { status_code, body: Some(body.into()) }
    }

    pub fn without_body(status_code: u16) -> Self {
        Self { status_code, body: None }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// A request that never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect(error.to_string())
        } else {
            Self::Request(error.to_string())
        }
    }
}

/// Capability that performs one GET request against a URL.
///
/// Implementations carry their own timeout and never retry.
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

/// HTTP/HTTPS checker backed by a shared `reqwest` client
pub struct HttpChecker {
    client: reqwest::Client,
}

impl HttpChecker {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("wsmon/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Checker for HttpChecker {
    async fn fetch(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let response = self.client.get(url).send().await?;
        let status_code = response.status().as_u16();

        let body = match response.text().await {
            Ok(text) => Some(text),
            Err(e) => {
                debug!(%url, error = %e, "failed to read response body");
                None
            }
        };

        Ok(HttpResponse { status_code, body })
    }
}
