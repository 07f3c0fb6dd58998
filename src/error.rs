//! Error types for Rewind

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for Rewind operations
pub type Result<T> = std::result::Result<T, RewindError>;

/// Errors that can occur in Rewind
#[derive(Debug, Error)]
pub enum RewindError {
    /// No recorded interaction is eligible for the incoming request
    #[error("No matching interaction for {method} {url} (fingerprint {fingerprint})")]
    NoMatchingInteraction {
        /// Request method
        method: String,
        /// Normalized request URL
        url: String,
        /// Short hex fingerprint of the request
        fingerprint: String,
    },

    /// Cassette file failed structural validation
    #[error("Corrupt cassette {}: {reason}", path.display())]
    CorruptCassette {
        /// Cassette file path
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// Underlying read/write failure
    #[error("File error on {}: {source}", path.display())]
    FileError {
        /// File that was being accessed
        path: PathBuf,
        /// I/O error
        #[source]
        source: io::Error,
    },

    /// Interactions were left unconsumed at teardown (strict mode)
    #[error("{count} recorded interaction(s) were never replayed: {indices:?}")]
    UnconsumedInteractions {
        /// Number of unconsumed interactions
        count: usize,
        /// Their order indices
        indices: Vec<u64>,
    },

    /// The session has already been finished
    #[error("Session already finished")]
    SessionClosed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Request or response cannot be captured or rebuilt
    #[error("Invalid HTTP message: {0}")]
    InvalidMessage(String),

    /// Real transport failure
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl RewindError {
    /// Build a `FileError` for `path`
    pub fn file(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileError {
            path: path.into(),
            source,
        }
    }

    /// Build a `CorruptCassette` for `path`
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptCassette {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Check if this is a replay miss
    #[must_use]
    pub fn is_no_match(&self) -> bool {
        matches!(self, Self::NoMatchingInteraction { .. })
    }
}
