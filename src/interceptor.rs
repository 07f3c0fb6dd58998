//! Middleware hook for host HTTP clients
//!
//! The host hands each outgoing request to [`Interceptor::handle`] together
//! with a [`Next`] continuation that performs the real network call. Replayed
//! and live responses come back through the same return type, and every
//! engine failure is converted into the host's own error type.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::interaction::{Request, Response};
use crate::matcher::no_match;
use crate::mode::Action;
use crate::session::{Session, SessionReport};
use crate::RewindError;

/// Continuation that sends a request to the real network
pub trait Next: Send + Sync {
    /// Transport error type, also used to surface engine errors
    type Error: Send;

    /// Send `request` and wait for the complete response
    fn run(
        &self,
        request: hyper::Request<Bytes>,
    ) -> impl Future<Output = Result<hyper::Response<Bytes>, Self::Error>> + Send;
}

/// [`Next`] implementation backed by an async closure
#[derive(Clone)]
pub struct NextFn<F> {
    f: F,
}

/// Wrap an async closure as a [`Next`] continuation
pub fn next_fn<F, Fut, E>(f: F) -> NextFn<F>
where
    F: Fn(hyper::Request<Bytes>) -> Fut,
    Fut: Future<Output = Result<hyper::Response<Bytes>, E>>,
{
    NextFn { f }
}

impl<F, Fut, E> Next for NextFn<F>
where
    F: Fn(hyper::Request<Bytes>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<hyper::Response<Bytes>, E>> + Send,
    E: Send,
{
    type Error = E;

    fn run(
        &self,
        request: hyper::Request<Bytes>,
    ) -> impl Future<Output = Result<hyper::Response<Bytes>, E>> + Send {
        (self.f)(request)
    }
}

/// Record/replay interceptor bound to one session
#[derive(Clone)]
pub struct Interceptor {
    session: Arc<Session>,
}

impl Interceptor {
    /// Create an interceptor owning `session`
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(session),
        }
    }

    /// Underlying session
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Handle one outgoing request
    ///
    /// Replay paths answer from the cassette without calling `next`. Record
    /// paths call `next` outside the session lock and append the exchange
    /// once the full response is available; dropping the returned future
    /// before then leaves the cassette untouched.
    ///
    /// # Errors
    ///
    /// Returns `NoMatchingInteraction` on a replay miss, any error returned by
    /// `next` unchanged, and session errors converted into `N::Error`
    pub async fn handle<N>(
        &self,
        request: hyper::Request<Bytes>,
        next: &N,
    ) -> Result<hyper::Response<Bytes>, N::Error>
    where
        N: Next,
        N::Error: From<RewindError>,
    {
        let captured = Request::from_http(&request)?;
        let mode = self.session.mode();

        let hit = if mode.consults_cassette() {
            self.session.take_match(&captured).await?
        } else {
            self.session.check_open().await?;
            None
        };

        match (mode.action(hit.is_some()), hit) {
            (Action::Replay, Some(hit)) => return Ok(hit.response.to_http()?),
            (Action::Fail, _) => {
                let error = no_match(&captured);
                warn!("{error}");
                return Err(error.into());
            }
            _ if mode.consults_cassette() => debug!(
                "No recorded interaction for {} {}, forwarding",
                captured.method, captured.url
            ),
            _ => {}
        }

        let started = Instant::now();
        let response = next.run(request).await?;

        let mut recorded = Response::from_http(&response);
        recorded.duration_ms =
            Some(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));

        self.session.record(captured, recorded).await?;

        Ok(response)
    }

    /// Finish the underlying session
    ///
    /// # Errors
    ///
    /// See [`Session::finish`]
    pub async fn finish(&self) -> crate::Result<SessionReport> {
        self.session.finish().await
    }
}
