//! The HTTP transport seam.
//!
//! The core never talks to `reqwest` directly: everything goes through
//! [`HttpTransport`], so the scheduler and fetcher can be exercised against
//! instrumented fakes while production runs use [`ReqwestTransport`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use thiserror::Error;

/// Transport-level failure. HTTP status codes are never errors here; a
/// response with any status is a successful transport round trip.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request exceeded the per-attempt timeout.
    #[error("request timed out")]
    Timeout,
    /// TCP/TLS connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),
    /// Any other transport failure (DNS, protocol, body read).
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

/// One HTTP request as the core sees it.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method. Comparisons only issue GETs, but the transport carries
    /// the full verb set for the embedding application.
    pub method: Method,
    /// Absolute request URL.
    pub url: String,
    /// Request headers.
    pub headers: BTreeMap<String, String>,
    /// Optional request body.
    pub body: Option<String>,
}

impl TransportRequest {
    /// A GET request with the given headers.
    pub fn get(url: &str, headers: &BTreeMap<String, String>) -> Self {
        TransportRequest {
            method: Method::GET,
            url: url.to_string(),
            headers: headers.clone(),
            body: None,
        }
    }
}

/// One HTTP response as the core sees it.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

/// The external HTTP capability the core depends on.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Executes one request and returns the response, or a transport error.
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// Production transport backed by a shared `reqwest` client.
pub struct ReqwestTransport {
    client: Arc<reqwest::Client>,
}

impl ReqwestTransport {
    /// Wraps an initialized client (see `initialization::init_client`).
    pub fn new(client: Arc<reqwest::Client>) -> Self {
        ReqwestTransport { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}
