//! Transport trait definition.

use crate::error::TransportResult;
use std::path::Path;

/// A lazy sequence of remote keys.
///
/// A failure mid-listing surfaces as an `Err` item; the caller must not
/// assume the keys received before the error are a complete listing.
pub type KeyStream<'a> = Box<dyn Iterator<Item = TransportResult<String>> + Send + 'a>;

/// A remote store for timestamped snapshot archives.
///
/// This is the only interface the sync engine requires from a backend.
/// Implementations differ in session handling (FTP holds a live
/// connection, S3 is stateless per call) but must be indistinguishable
/// from the engine's point of view.
///
/// # Invariants
///
/// - Keys are `/`-separated relative paths; backends map them to their own
///   namespace (bucket keys, directories under a base path).
/// - `list(prefix)` yields every key starting with `prefix`, lazily.
/// - Snapshots are immutable: `upload` always writes a new key, and
///   replacement remote state is expressed as a new snapshot, never as an
///   in-place overwrite.
/// - `rename` may be copy-then-delete on backends without an atomic
///   rename; on failure after the copy, both keys can transiently exist.
///
/// Operations block on network I/O and carry no timeout of their own; any
/// deadline or cancellation is the caller's to impose.
pub trait Transport: Send + Sync {
    /// Uploads a local file to the given remote key.
    ///
    /// Backends requiring explicit intermediate directories create them
    /// lazily on the first missing-path failure and retry the write
    /// exactly once.
    fn upload(&self, local: &Path, key: &str) -> TransportResult<()>;

    /// Downloads a remote key to a local file, replacing it if present.
    fn download(&self, key: &str, local: &Path) -> TransportResult<()>;

    /// Lists every remote key starting with `prefix`.
    fn list(&self, prefix: &str) -> KeyStream<'_>;

    /// Renames a remote key.
    fn rename(&self, old_key: &str, new_key: &str) -> TransportResult<()>;
}

/// Wraps a single listing error as a one-item [`KeyStream`].
pub(crate) fn error_stream<'a>(err: crate::TransportError) -> KeyStream<'a> {
    Box::new(std::iter::once(Err(err)))
}
