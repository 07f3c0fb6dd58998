//! Cassette file reader

use std::path::Path;

use serde::Deserialize;

use super::format::{Cassette, CASSETTE_VERSION};
use crate::{Result, RewindError};

/// Minimal view used to reject unsupported versions before full parsing
#[derive(Deserialize)]
struct VersionHeader {
    version: Option<u32>,
}

/// Load and validate a cassette file
///
/// # Errors
///
/// Returns `FileError` if the file cannot be read and `CorruptCassette` if it
/// is not a valid cassette document
pub fn load(path: &Path) -> Result<Cassette> {
    let bytes = std::fs::read(path).map_err(|e| RewindError::file(path, e))?;
    let content = String::from_utf8(bytes)
        .map_err(|e| RewindError::corrupt(path, format!("not UTF-8: {e}")))?;

    parse(path, &content)
}

/// Parse a cassette document
///
/// # Errors
///
/// Returns `CorruptCassette` if the document is invalid
pub fn parse(path: &Path, content: &str) -> Result<Cassette> {
    let header: VersionHeader =
        serde_yaml::from_str(content).map_err(|e| RewindError::corrupt(path, e.to_string()))?;

    match header.version {
        Some(CASSETTE_VERSION) => {}
        Some(version) => {
            return Err(RewindError::corrupt(
                path,
                format!("unsupported version {version}, expected {CASSETTE_VERSION}"),
            ));
        }
        None => return Err(RewindError::corrupt(path, "missing field `version`")),
    }

    let cassette: Cassette =
        serde_yaml::from_str(content).map_err(|e| RewindError::corrupt(path, e.to_string()))?;

    cassette
        .validate()
        .map_err(|reason| RewindError::corrupt(path, reason))?;

    Ok(cassette)
}
