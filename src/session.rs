//! Record/replay session
//!
//! A `Session` binds one cassette to one mode for the duration of a test. All
//! bookkeeping (selecting and consuming a match, appending a recording) goes
//! through a single lock; callers never hold it across network I/O.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{Config, RedactionConfig};
use crate::fingerprint::short_fingerprint;
use crate::interaction::{Request, Response};
use crate::matcher::{MatchCursor, Matcher};
use crate::mode::Mode;
use crate::storage::{self, Cassette};
use crate::{Result, RewindError};

/// Mutable state guarded by the session lock
struct SessionState {
    cassette: Cassette,
    cursor: MatchCursor,
    replayed: usize,
    recorded: usize,
}

/// Outcome of a finished session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// Session mode
    pub mode: Mode,
    /// Interactions served from the cassette
    pub replayed: usize,
    /// Interactions appended to the cassette
    pub recorded: usize,
    /// Order indices of interactions that were never replayed
    pub unconsumed: Vec<u64>,
    /// Whether the cassette was written to disk
    pub saved: bool,
}

/// A replayed interaction
#[derive(Debug, Clone)]
pub struct Replayed {
    /// Order index of the consumed interaction
    pub order_index: u64,
    /// Recorded response
    pub response: Response,
}

/// A single record/replay session
pub struct Session {
    path: PathBuf,
    mode: Mode,
    matcher: Matcher,
    redaction: RedactionConfig,
    strict_unconsumed: bool,
    state: Mutex<Option<SessionState>>,
}

impl Session {
    /// Open a session for `config`
    ///
    /// Replay requires the cassette to exist. Record and `RecordIfMissing`
    /// continue an existing cassette or start an empty one.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the cassette cannot be
    /// loaded
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;

        let cassette = if config.mode.is_replay() {
            storage::load(&config.cassette)?
        } else {
            storage::load_or_create(&config.cassette, config.mode)?
        };

        info!(
            "Opened {} session on {} ({} interactions)",
            config.mode,
            config.cassette.display(),
            cassette.len()
        );

        Ok(Self::with_cassette(config, cassette))
    }

    /// Build a session around an in-memory cassette
    #[must_use]
    pub fn with_cassette(config: &Config, cassette: Cassette) -> Self {
        let matcher =
            Matcher::new(config.matching.clone()).with_redacted(&config.redaction.headers);

        Self {
            path: config.cassette.clone(),
            mode: config.mode,
            matcher,
            redaction: config.redaction.clone(),
            strict_unconsumed: config.strict_unconsumed,
            state: Mutex::new(Some(SessionState {
                cursor: MatchCursor::new(cassette.len()),
                cassette,
                replayed: 0,
                recorded: 0,
            })),
        }
    }

    /// Session mode
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Cassette file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fail if the session has been finished
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` after `finish`
    pub async fn check_open(&self) -> Result<()> {
        if self.state.lock().await.is_some() {
            Ok(())
        } else {
            Err(RewindError::SessionClosed)
        }
    }

    /// Select and consume the interaction answering `request`
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` after `finish`
    pub async fn take_match(&self, request: &Request) -> Result<Option<Replayed>> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or(RewindError::SessionClosed)?;

        let Some(position) =
            self.matcher
                .select(state.cassette.interactions(), &mut state.cursor, request)
        else {
            return Ok(None);
        };

        state.replayed += 1;
        let interaction = &state.cassette.interactions()[position];

        debug!(
            "Replayed #{} for {} {} ({})",
            interaction.order_index,
            request.method,
            request.url,
            short_fingerprint(request)
        );

        Ok(Some(Replayed {
            order_index: interaction.order_index,
            response: interaction.response.clone(),
        }))
    }

    /// Append a live exchange and return its order index
    ///
    /// The new interaction counts as consumed, so it is never replayed later
    /// in the same session.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMessage` if the exchange could not be written to a
    /// cassette, and `SessionClosed` after `finish`
    pub async fn record(&self, mut request: Request, response: Response) -> Result<u64> {
        request
            .headers
            .redact(&self.redaction.headers, &self.redaction.placeholder);
        request.validate()?;
        response.validate()?;

        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or(RewindError::SessionClosed)?;

        let fingerprint = short_fingerprint(&request);
        let method = request.method.clone();
        let url = request.url.clone();

        let order_index = state.cassette.push(request, response);
        state.cursor.push_consumed();
        state.recorded += 1;

        debug!(
            "Recorded #{order_index}: {method} {url} ({fingerprint}, session total {})",
            state.cassette.len()
        );

        Ok(order_index)
    }

    /// Copy of the current in-memory cassette
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` after `finish`
    pub async fn snapshot(&self) -> Result<Cassette> {
        let guard = self.state.lock().await;
        guard
            .as_ref()
            .map(|state| state.cassette.clone())
            .ok_or(RewindError::SessionClosed)
    }

    /// Finish the session
    ///
    /// Saves the cassette unless the mode is Replay, then reports leftover
    /// interactions. The cassette is saved before a strict-mode failure is
    /// returned. When the save itself fails the session stays open, so
    /// `finish` can be retried and the drop-time flush still applies.
    ///
    /// # Errors
    ///
    /// Returns error if saving fails, if the session was already finished, or
    /// if strict mode is on and interactions were left unconsumed
    pub async fn finish(&self) -> Result<SessionReport> {
        let mut guard = self.state.lock().await;
        let state = guard.as_ref().ok_or(RewindError::SessionClosed)?;

        // A failed save leaves the session open for another attempt
        let report = self.teardown(state)?;
        *guard = None;
        drop(guard);

        if !report.unconsumed.is_empty() && self.strict_unconsumed {
            return Err(RewindError::UnconsumedInteractions {
                count: report.unconsumed.len(),
                indices: report.unconsumed,
            });
        }

        Ok(report)
    }

    fn teardown(&self, state: &SessionState) -> Result<SessionReport> {
        let saved = if self.mode.persists() {
            storage::save(&self.path, &state.cassette)?;
            true
        } else {
            false
        };

        let unconsumed: Vec<u64> = if self.mode.reports_unconsumed() {
            state
                .cursor
                .unconsumed()
                .filter_map(|i| state.cassette.get(i))
                .map(|interaction| interaction.order_index)
                .collect()
        } else {
            Vec::new()
        };

        if !unconsumed.is_empty() {
            warn!(
                "{} interaction(s) in {} were never replayed: {:?}",
                unconsumed.len(),
                self.path.display(),
                unconsumed
            );
        }

        info!(
            "Finished {} session on {}: {} replayed, {} recorded",
            self.mode,
            self.path.display(),
            state.replayed,
            state.recorded
        );

        Ok(SessionReport {
            mode: self.mode,
            replayed: state.replayed,
            recorded: state.recorded,
            unconsumed,
            saved,
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Sessions dropped without `finish` still flush their recordings
        if let Some(state) = self.state.get_mut().take() {
            if let Err(e) = self.teardown(&state) {
                warn!("Failed to save {} on drop: {e}", self.path.display());
            }
        }
    }
}
