//! Shared helpers for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Barrier;

use rewind::{Next, Result, RewindError};

/// In-process stand-in for the network
///
/// Answers every request with a body derived from the request itself, so a
/// replayed response can be compared with the one captured live.
#[derive(Default)]
pub struct StubTransport {
    calls: AtomicUsize,
    delays: HashMap<String, Duration>,
    barrier: Option<Arc<Barrier>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay responses for `path`
    pub fn with_delay(mut self, path: &str, delay: Duration) -> Self {
        self.delays.insert(path.to_string(), delay);
        self
    }

    /// Hold every request until `parties` requests are in flight at once
    pub fn with_barrier(mut self, parties: usize) -> Self {
        self.barrier = Some(Arc::new(Barrier::new(parties)));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Next for StubTransport {
    type Error = RewindError;

    async fn run(&self, request: hyper::Request<Bytes>) -> Result<hyper::Response<Bytes>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let path = request.uri().path().to_string();
        if let Some(delay) = self.delays.get(&path) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }

        let response = match path.as_str() {
            "/binary" => hyper::Response::builder()
                .status(200)
                .header("content-type", "application/octet-stream")
                .body(Bytes::from((0u8..=255).collect::<Vec<_>>())),
            "/empty" => hyper::Response::builder().status(204).body(Bytes::new()),
            "/cookies" => hyper::Response::builder()
                .status(200)
                .header("set-cookie", "a=1")
                .header("set-cookie", "b=2")
                .body(Bytes::from_static(b"cookies")),
            _ => {
                let body = format!(
                    "{} {} ({} bytes)",
                    request.method(),
                    request.uri(),
                    request.body().len()
                );
                hyper::Response::builder()
                    .status(200)
                    .header("content-type", "text/plain")
                    .body(Bytes::from(body))
            }
        };

        response.map_err(|e| RewindError::Other(e.to_string()))
    }
}

pub fn get(url: &str) -> hyper::Request<Bytes> {
    hyper::Request::builder()
        .method("GET")
        .uri(url)
        .body(Bytes::new())
        .unwrap()
}

pub fn post(url: &str, body: impl Into<Bytes>) -> hyper::Request<Bytes> {
    hyper::Request::builder()
        .method("POST")
        .uri(url)
        .body(body.into())
        .unwrap()
}

/// Status, headers and body of a response, for byte-exact comparison
pub fn snapshot(response: &hyper::Response<Bytes>) -> (u16, Vec<(String, Vec<u8>)>, Bytes) {
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| (name.to_string(), value.as_bytes().to_vec()))
        .collect();
    (response.status().as_u16(), headers, response.body().clone())
}
