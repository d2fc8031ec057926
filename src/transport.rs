//! Network transport abstraction
//!
//! The gateway talks to the network through the [`Transport`] trait so tests
//! can substitute scripted responses. The real implementation is a thin
//! reqwest wrapper. A failure status is surfaced as an error, not as a
//! response, so "cache only successful responses" falls out of the types.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

/// An outbound request. Only the URL matters for classification and caching.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// A successful response: status plus decoded JSON body
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    /// Synthesizes an OK response around an already-available body
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }
}

/// Errors that can occur sending a request
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or the body could not be read
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a failure status
    #[error("server returned status {status}")]
    Status { status: u16 },
}

/// Opaque request-to-response function over the network
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &Request) -> Result<Response, TransportError>;
}

/// reqwest-backed transport
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with default client settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let response = self.client.get(&request.url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await?;
        Ok(Response {
            status: status.as_u16(),
            body,
        })
    }
}
