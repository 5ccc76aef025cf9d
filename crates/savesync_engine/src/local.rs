//! Local state inspection.

use crate::error::SyncResult;
use chrono::{DateTime, Utc};
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

/// Returns the newest modification time among the regular files under
/// `dir`, truncated to the second, or `None` when the directory holds no
/// regular files.
///
/// This is the local analog of a snapshot's timestamp and is compared
/// directly against decoded remote stamps. It is recomputed on every run;
/// caching it across runs would miss changes made between syncs.
pub fn local_save_time(dir: &Path) -> SyncResult<Option<DateTime<Utc>>> {
    let mut newest: Option<i64> = None;

    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(into_io)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let metadata = entry.metadata().map_err(into_io)?;
        let secs = metadata
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        newest = Some(newest.map_or(secs, |n| n.max(secs)));
    }

    Ok(newest.and_then(|secs| DateTime::from_timestamp(secs, 0)))
}

fn into_io(err: walkdir::Error) -> io::Error {
    err.into_io_error()
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop"))
}
