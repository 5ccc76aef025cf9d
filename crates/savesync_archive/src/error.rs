//! Error types for archive operations.

use std::io;
use thiserror::Error;

/// Result type for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Errors that can occur while packing or unpacking archives.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The zip container itself is invalid or could not be written.
    #[error("zip error: {0}")]
    Zip(#[from] ::zip::result::ZipError),

    /// An archive entry would be written outside the extraction root.
    ///
    /// This is the zip-slip guard. It aborts the remaining entries of the
    /// unpack and must never be downgraded to a skip.
    #[error("path traversal in archive entry: {entry}")]
    PathTraversal {
        /// The offending entry name as stored in the archive.
        entry: String,
    },

    /// The pack source is not a directory.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The path that was expected to be a directory.
        path: String,
    },
}

impl ArchiveError {
    /// Creates a path traversal error for the given entry name.
    pub fn path_traversal(entry: impl Into<String>) -> Self {
        Self::PathTraversal {
            entry: entry.into(),
        }
    }
}
