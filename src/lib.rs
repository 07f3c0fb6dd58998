//! Rewind - Deterministic HTTP record-replay for tests
//!
//! Outgoing requests pass through an [`Interceptor`] bound to a [`Session`].
//! Depending on the session [`Mode`], the interceptor answers from a recorded
//! cassette, forwards to the real transport and records the exchange, or
//! replays when it can and records otherwise.

#![deny(unsafe_code)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::cast_possible_truncation,
    clippy::multiple_crate_versions
)]

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod interaction;
pub mod interceptor;
pub mod matcher;
pub mod mode;
pub mod session;
pub mod storage;
pub mod transport;

pub use config::Config;
pub use error::{Result, RewindError};
pub use interaction::{Body, Headers, Interaction, Method, Request, Response};
pub use interceptor::{next_fn, Interceptor, Next};
pub use matcher::{MatchPolicy, Matcher};
pub use mode::Mode;
pub use session::{Session, SessionReport};
pub use storage::Cassette;
pub use transport::HyperTransport;
