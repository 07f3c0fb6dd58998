//! Real HTTP transport used on record paths

use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, warn};

use crate::interceptor::Next;
use crate::{Result, RewindError};

/// Plain-HTTP client for forwarding requests
pub struct HyperTransport {
    client: Client<HttpConnector, Full<Bytes>>,
    timeout: Option<Duration>,
}

impl HyperTransport {
    /// Create a new transport
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build_http();

        Self {
            client,
            timeout: None,
        }
    }

    /// Fail requests that take longer than `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Send a request and collect the full response body
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the request fails, times out, or the body
    /// cannot be read
    pub async fn send(&self, request: hyper::Request<Bytes>) -> Result<hyper::Response<Bytes>> {
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.exchange(request))
                .await
                .map_err(|elapsed| {
                    warn!("Request timed out after {timeout:?}");
                    RewindError::Transport(Box::new(elapsed))
                })?,
            None => self.exchange(request).await,
        }
    }

    async fn exchange(&self, request: hyper::Request<Bytes>) -> Result<hyper::Response<Bytes>> {
        debug!("Forwarding {} to {}", request.method(), request.uri());

        let response = self
            .client
            .request(request.map(Full::new))
            .await
            .map_err(|e| {
                warn!("Request failed: {e}");
                RewindError::Transport(Box::new(e))
            })?;

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| RewindError::Transport(Box::new(e)))?
            .to_bytes();

        Ok(hyper::Response::from_parts(parts, body))
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Next for HyperTransport {
    type Error = RewindError;

    async fn run(&self, request: hyper::Request<Bytes>) -> Result<hyper::Response<Bytes>> {
        self.send(request).await
    }
}
