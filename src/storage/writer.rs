//! Cassette file writer

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use super::format::Cassette;
use crate::{Result, RewindError};

/// Serialize a cassette document
///
/// The same cassette always yields the same bytes.
///
/// # Errors
///
/// Returns error if serialization fails
pub fn to_yaml(cassette: &Cassette) -> Result<String> {
    serde_yaml::to_string(cassette)
        .map_err(|e| RewindError::Other(format!("Failed to serialize cassette: {e}")))
}

/// Write a cassette to `path` atomically
///
/// The document is written to a temporary file in the same directory, synced,
/// then renamed over `path`. Readers see either the previous file or the new
/// one, never a partial write.
///
/// # Errors
///
/// Returns `InvalidMessage` if the cassette would not load back, and
/// `FileError` if the directory is missing or the write fails
pub fn save(path: &Path, cassette: &Cassette) -> Result<()> {
    cassette.validate().map_err(|reason| {
        RewindError::InvalidMessage(format!("Refusing to save {}: {reason}", path.display()))
    })?;

    let document = to_yaml(cassette)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| RewindError::file(dir, e))?;
    tmp.write_all(document.as_bytes())
        .map_err(|e| RewindError::file(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| RewindError::file(tmp.path(), e))?;

    tmp.persist(path)
        .map_err(|e| RewindError::file(path, e.error))?;

    Ok(())
}
