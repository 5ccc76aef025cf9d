//! Error types for transport operations.

use std::io;
use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors that can occur while talking to a remote store.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A local I/O error occurred while staging or receiving a file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The backend rejected the credentials.
    ///
    /// Raised by the backend constructors; fatal at startup.
    #[error("authentication failed: {message}")]
    Auth {
        /// Backend-reported reason.
        message: String,
    },

    /// An FTP protocol error.
    #[error("FTP error: {0}")]
    Ftp(#[from] suppaftp::FtpError),

    /// A remote operation failed.
    #[error("failed {operation} {key}: {message}")]
    Remote {
        /// The operation that failed (upload, download, list, rename).
        operation: &'static str,
        /// The remote key involved.
        key: String,
        /// Backend-reported reason.
        message: String,
    },
}

impl TransportError {
    /// Creates an authentication failure.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Creates a remote operation failure.
    pub fn remote(
        operation: &'static str,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Remote {
            operation,
            key: key.into(),
            message: message.into(),
        }
    }
}
