//! Upstream HTTP transport.
//!
//! [`UpstreamTransport`] is the single seam between the forwarding engine and
//! the network. [`ReqwestTransport`] is the production implementation; tests
//! substitute a recording transport to assert exactly which calls were made.

use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};

use crate::error::TransportError;

/// A fully-shaped outbound request.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    /// Destination URL including the raw query string, if any.
    pub url: String,
    pub headers: HeaderMap,
    /// `None` when the inbound request carried no body.
    pub body: Option<Bytes>,
    pub timeout: Duration,
}

/// Whatever the upstream answered, regardless of status code.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Executes one upstream call.
///
/// Implementations must return `Ok` for every HTTP response, including 4xx
/// and 5xx. Only network-level failures are `Err`.
#[async_trait::async_trait]
pub trait UpstreamTransport: Send + Sync + 'static {
    /// Send the request and buffer the full response.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on timeout, connection or DNS failure.
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError>;
}

/// Transport backed by a shared `reqwest::Client`.
///
/// The client pools connections per host; reuse is an optimization only.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with a dedicated client.
    ///
    /// Redirects are not followed so the console sees exactly what the
    /// cluster answered.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidRequest`] if the TLS backend cannot
    /// be initialized.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("garage-console/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::InvalidRequest {
                url: String::new(),
                reason: format!("failed to build http client: {e}"),
            })?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl UpstreamTransport for ReqwestTransport {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        let url = request.url;
        let mut builder = self
            .client
            .request(request.method, &url)
            .headers(request.headers)
            .timeout(request.timeout);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| classify(&url, &e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| classify(&url, &e))?;

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify(url: &str, err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            url: url.to_owned(),
        }
    } else if err.is_builder() {
        TransportError::InvalidRequest {
            url: url.to_owned(),
            reason: err.to_string(),
        }
    } else {
        TransportError::Connect {
            url: url.to_owned(),
            reason: err.to_string(),
        }
    }
}
