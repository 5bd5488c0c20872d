//! reqwest-backed [`HttpTransport`]

use async_trait::async_trait;
use ddns_core::traits::{HttpRequest, HttpResponse, HttpTransport, Method};
use ddns_core::{Error, Result, TransportErrorKind};
use std::time::Duration;
use tracing::debug;

/// Default HTTP timeout for API requests (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport over a shared `reqwest::Client`
///
/// The client is cheap to clone and pools connections, so one transport is
/// shared by every driver the registry creates.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with the default 30s timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a transport with a custom timeout
    ///
    /// # Returns
    ///
    /// - `Ok(ReqwestTransport)`: Ready to send
    /// - `Err(Error::Transport)`: The TLS backend could not be initialised
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::transport(TransportErrorKind::Network, e.to_string()))?;
        Ok(Self { client })
    }
}

fn method_of(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn classify(e: reqwest::Error) -> Error {
    let kind = if e.is_timeout() {
        TransportErrorKind::Timeout
    } else if e.is_decode() {
        TransportErrorKind::Decode
    } else {
        TransportErrorKind::Network
    };
    Error::transport(kind, e.to_string())
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!("{} {}", request.method, request.url);

        let mut builder = self.client.request(method_of(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(classify)?;

        debug!("HTTP {} ({} bytes)", status, body.len());
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}
