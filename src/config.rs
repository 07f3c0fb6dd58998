//! Configuration types for Rewind

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use hyper::header::{HeaderName, HeaderValue};

use crate::matcher::{HeaderMatch, MatchPolicy};
use crate::mode::Mode;
use crate::{Result, RewindError};

/// Environment variable that overrides the configured mode
pub const MODE_ENV: &str = "REWIND_MODE";

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cassette file to load and/or write
    pub cassette: PathBuf,
    /// Operating mode
    pub mode: Mode,
    /// Matching policy
    #[serde(default)]
    pub matching: MatchPolicy,
    /// Fail teardown when recorded interactions were never replayed
    #[serde(default)]
    pub strict_unconsumed: bool,
    /// Redaction configuration
    #[serde(default)]
    pub redaction: RedactionConfig,
}

/// Redaction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionConfig {
    /// Request headers whose values are masked before they reach the cassette
    #[serde(default)]
    pub headers: Vec<String>,
    /// Replacement value
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

fn default_placeholder() -> String {
    "[REDACTED]".to_string()
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            placeholder: default_placeholder(),
        }
    }
}

impl Config {
    /// Configuration with default matching and no redaction
    pub fn new(cassette: impl Into<PathBuf>, mode: Mode) -> Self {
        Self {
            cassette: cassette.into(),
            mode,
            matching: MatchPolicy::default(),
            strict_unconsumed: false,
            redaction: RedactionConfig::default(),
        }
    }

    /// Set the matching policy
    #[must_use]
    pub fn with_matching(mut self, matching: MatchPolicy) -> Self {
        self.matching = matching;
        self
    }

    /// Fail teardown on unconsumed interactions
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_unconsumed = strict;
        self
    }

    /// Redact the given request headers in recorded interactions
    #[must_use]
    pub fn redact_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.redaction.headers = names.into_iter().map(Into::into).collect();
        self
    }

    /// Load configuration from TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RewindError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| RewindError::ConfigError(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Replace the mode with the value of `REWIND_MODE`, if set
    ///
    /// # Errors
    ///
    /// Returns error if the variable holds an unknown mode
    pub fn with_env_override(mut self) -> Result<Self> {
        if let Ok(value) = std::env::var(MODE_ENV) {
            self.mode = value.parse()?;
        }
        Ok(self)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<()> {
        if self.cassette.as_os_str().is_empty() {
            return Err(RewindError::ConfigError(
                "Cassette path cannot be empty".to_string(),
            ));
        }

        if self.cassette.is_dir() {
            return Err(RewindError::ConfigError(format!(
                "Cassette path is a directory: {}",
                self.cassette.display()
            )));
        }

        if let HeaderMatch::Subset(names) = &self.matching.headers {
            for name in names {
                validate_header_name("matching.headers", name)?;
            }
        }

        for name in &self.redaction.headers {
            validate_header_name("redaction.headers", name)?;
        }

        HeaderValue::from_str(&self.redaction.placeholder).map_err(|_| {
            RewindError::ConfigError(format!(
                "redaction.placeholder: invalid header value '{}'",
                self.redaction.placeholder
            ))
        })?;

        Ok(())
    }
}

fn validate_header_name(field: &str, name: &str) -> Result<()> {
    HeaderName::from_bytes(name.as_bytes())
        .map(|_| ())
        .map_err(|_| RewindError::ConfigError(format!("{field}: invalid header name '{name}'")))
}
