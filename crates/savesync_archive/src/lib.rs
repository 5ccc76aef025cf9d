//! # savesync archive
//!
//! Zip packing and extraction for savesync.
//!
//! This crate turns a save directory into a single zip archive and back.
//! It is deliberately small and owns the two filesystem-facing invariants
//! of the synchronizer:
//!
//! - **Traversal protection**: every extraction write is resolved through
//!   [`safe_join`], which rejects any entry whose target would escape the
//!   destination directory (zip-slip).
//! - **Modification-time preservation**: packing records each file's mtime
//!   with 1-second precision and extraction restores it, so the newest
//!   local mtime round-trips through an archive unchanged.
//!
//! ## Semantics
//!
//! - [`pack`] walks the source recursively and stores **regular files
//!   only**. Symlinks are not followed and empty directories are not
//!   recorded.
//! - [`unpack`] recreates the file tree. A traversal attempt aborts the
//!   remaining entries; the destination may be left partially written.
//!
//! ## Example
//!
//! ```no_run
//! use savesync_archive::{pack, unpack};
//!
//! pack("saves/elden-ring".as_ref(), "staging/elden-ring.zip".as_ref())?;
//! unpack("staging/elden-ring.zip".as_ref(), "saves/elden-ring".as_ref())?;
//! # Ok::<(), savesync_archive::ArchiveError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod path;
mod zip;

pub use error::{ArchiveError, ArchiveResult};
pub use path::safe_join;
pub use zip::{pack, unpack};
