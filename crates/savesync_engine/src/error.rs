//! Error types for the sync engine.

use std::io;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Packing or unpacking an archive failed.
    #[error("archive error: {0}")]
    Archive(#[from] savesync_archive::ArchiveError),

    /// A remote operation failed.
    #[error("transport error: {0}")]
    Transport(#[from] savesync_transport::TransportError),

    /// A local I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A snapshot timestamp did not match the expected encoding.
    ///
    /// Fatal only when decoding an explicit input; a malformed key in a
    /// remote listing is logged and skipped instead.
    #[error("malformed snapshot timestamp: {value:?}")]
    MalformedTimestamp {
        /// The string that failed to decode.
        value: String,
    },

    /// Setting up the filesystem watcher failed.
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
}

impl SyncError {
    /// Creates a malformed timestamp error.
    pub fn malformed_timestamp(value: impl Into<String>) -> Self {
        Self::MalformedTimestamp {
            value: value.into(),
        }
    }
}
