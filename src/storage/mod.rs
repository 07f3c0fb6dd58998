//! Cassette persistence
//!
//! Cassettes are stored as YAML documents. This module is the only writer of
//! cassette files.

mod format;
mod reader;
mod writer;

use std::path::Path;

pub use format::{Cassette, CASSETTE_VERSION};
pub use reader::{load, parse};
pub use writer::{save, to_yaml};

use crate::mode::Mode;
use crate::Result;

/// Load `path`, or start an empty cassette when the file does not exist yet
///
/// # Errors
///
/// Returns error if an existing file cannot be read or is corrupt
pub fn load_or_create(path: &Path, mode: Mode) -> Result<Cassette> {
    if path.exists() {
        load(path)
    } else {
        Ok(Cassette::create_empty(mode))
    }
}
