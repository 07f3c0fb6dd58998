//! Session-wide record/replay mode

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::RewindError;

/// Operating mode, fixed for the lifetime of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Always forward to the real transport and append the exchange
    Record,
    /// Serve only from the cassette; a miss is a hard failure
    Replay,
    /// Replay when a recorded interaction matches, record otherwise
    RecordIfMissing,
}

/// What the interceptor does with one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Answer from the matched interaction
    Replay,
    /// Send to the real transport and append the result
    Forward,
    /// Fail the request with `NoMatchingInteraction`
    Fail,
}

impl Mode {
    /// Check if mode is Record
    #[must_use]
    pub fn is_record(&self) -> bool {
        matches!(self, Mode::Record)
    }

    /// Check if mode is Replay
    #[must_use]
    pub fn is_replay(&self) -> bool {
        matches!(self, Mode::Replay)
    }

    /// Whether requests are first looked up in the cassette
    #[must_use]
    pub fn consults_cassette(&self) -> bool {
        !self.is_record()
    }

    /// Action for a request, given whether the cassette had a match
    #[must_use]
    pub fn action(&self, matched: bool) -> Action {
        match (self, matched) {
            (Mode::Record, _) => Action::Forward,
            (_, true) => Action::Replay,
            (Mode::Replay, false) => Action::Fail,
            (Mode::RecordIfMissing, false) => Action::Forward,
        }
    }

    /// Whether the cassette is written back at teardown
    #[must_use]
    pub fn persists(&self) -> bool {
        !self.is_replay()
    }

    /// Whether leftover interactions are reported at teardown
    #[must_use]
    pub fn reports_unconsumed(&self) -> bool {
        self.consults_cassette()
    }

    /// Name used in config files and cassette metadata
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Record => "record",
            Mode::Replay => "replay",
            Mode::RecordIfMissing => "record_if_missing",
        }
    }
}

impl FromStr for Mode {
    type Err = RewindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "record" => Ok(Mode::Record),
            "replay" => Ok(Mode::Replay),
            "record_if_missing" => Ok(Mode::RecordIfMissing),
            other => Err(RewindError::ConfigError(format!("Unknown mode '{other}'"))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
