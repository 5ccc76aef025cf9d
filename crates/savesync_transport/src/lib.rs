//! # savesync transport
//!
//! Backend-agnostic archive transfer for savesync.
//!
//! The whole remote surface of the synchronizer is the four-operation
//! [`Transport`] trait: upload a local file under a key, download a key to
//! a local file, list the keys under a prefix, and rename a key. The sync
//! engine never learns which backend it is talking to.
//!
//! ## Backends
//!
//! - [`S3Transport`] - object storage (AWS S3 or any S3-compatible store
//!   such as MinIO). Stateless per call; each operation is an independent
//!   request.
//! - [`FtpTransport`] - plain FTP. Session-oriented; authenticates once at
//!   construction and holds the live connection for its lifetime.
//! - [`MemoryTransport`] - in-memory store for tests, with failure
//!   injection.
//!
//! Authentication failures are surfaced as [`TransportError::Auth`] from
//! the constructors; no sync can proceed without a working backend.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod ftp;
mod memory;
mod s3;
mod transport;

pub use error::{TransportError, TransportResult};
pub use ftp::FtpTransport;
pub use memory::MemoryTransport;
pub use s3::{S3Config, S3Transport};
pub use transport::{KeyStream, Transport};
