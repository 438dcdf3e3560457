//! Maps archive identifiers to directories under the base directory.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::ArchiveError;

/// A validated request for one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRequest {
    /// Identifier as it appeared in the URL path.
    pub identifier: String,
    /// Canonical directory to compress, always inside the base directory.
    pub path: PathBuf,
}

/// Resolves identifiers against a fixed base directory.
///
/// Identifiers come straight from the URL, so anything that could name a
/// location outside the base directory is reported as not found, including
/// symlinks that point elsewhere.
#[derive(Debug, Clone)]
pub struct ArchiveResolver {
    base_dir: PathBuf,
}

impl ArchiveResolver {
    /// Create a resolver, canonicalizing `base_dir`.
    pub fn new(base_dir: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            base_dir: base_dir.as_ref().canonicalize()?,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve `identifier` to an existing directory.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NotFound`] when the identifier is malformed,
    /// escapes the base directory, or names something that is not a directory.
    pub fn resolve(&self, identifier: &str) -> Result<ArchiveRequest, ArchiveError> {
        if !is_plain_segment(identifier) {
            return Err(ArchiveError::not_found(identifier));
        }

        let path = self
            .base_dir
            .join(identifier)
            .canonicalize()
            .map_err(|_| ArchiveError::not_found(identifier))?;

        if !path.starts_with(&self.base_dir) || path == self.base_dir || !path.is_dir() {
            return Err(ArchiveError::not_found(identifier));
        }

        Ok(ArchiveRequest {
            identifier: identifier.to_string(),
            path,
        })
    }
}

/// A single, non-special path segment.
fn is_plain_segment(identifier: &str) -> bool {
    !identifier.is_empty()
        && identifier != "."
        && identifier != ".."
        && !identifier.contains(['/', '\\', '\0'])
}
