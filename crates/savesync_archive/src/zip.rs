//! Directory packing and archive extraction.

use crate::error::{ArchiveError, ArchiveResult};
use crate::path::safe_join;
use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use filetime::FileTime;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;
use ::zip::extra_fields::ExtraField;
use ::zip::write::FullFileOptions;
use ::zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Header id of the Info-ZIP extended timestamp extra field ("UT").
///
/// DOS timestamps in the standard header have 2-second granularity; the
/// synchronizer compares modification times to the second, so every packed
/// entry also carries its mtime as a unix timestamp in this field.
const EXTENDED_TIMESTAMP_ID: u16 = 0x5455;

/// Packs a directory tree into a zip archive.
///
/// Walks `source_dir` recursively and stores every regular file under its
/// path relative to `source_dir`, with `/` separators and Deflate
/// compression. Symlinks are not followed; special files and empty
/// directories are skipped.
///
/// A failed pack may leave a partial archive at `archive_path`; removing
/// it is the caller's responsibility.
///
/// # Errors
///
/// Returns [`ArchiveError::NotADirectory`] if `source_dir` is not a
/// directory, and [`ArchiveError::Io`] or [`ArchiveError::Zip`] on any
/// read or write failure.
pub fn pack(source_dir: &Path, archive_path: &Path) -> ArchiveResult<()> {
    if !source_dir.is_dir() {
        return Err(ArchiveError::NotADirectory {
            path: source_dir.display().to_string(),
        });
    }

    let mut writer = ZipWriter::new(File::create(archive_path)?);

    for entry in WalkDir::new(source_dir).follow_links(false) {
        let entry = entry.map_err(|e| {
            e.into_io_error()
                .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop"))
        })?;
        if !entry.file_type().is_file() {
            if !entry.file_type().is_dir() {
                tracing::debug!(path = %entry.path().display(), "skipping non-regular file");
            }
            continue;
        }

        let name = relative_entry_name(source_dir, entry.path())?;
        let mtime = file_mtime_secs(&entry.metadata().map_err(|e| {
            e.into_io_error()
                .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "metadata unavailable"))
        })?);

        let mut options = FullFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(dos_datetime(mtime));
        options.add_extra_data(
            EXTENDED_TIMESTAMP_ID,
            extended_timestamp_field(mtime),
            false,
        )?;

        writer.start_file(name, options)?;
        let mut reader = File::open(entry.path())?;
        io::copy(&mut reader, &mut writer)?;
    }

    writer.finish()?;
    Ok(())
}

/// Unpacks a zip archive into a destination directory.
///
/// Every entry's target path is resolved through [`safe_join`] before any
/// write; a traversal attempt aborts the remaining entries. Intermediate
/// directories are created as needed and each extracted file's
/// modification time is restored from the archive.
///
/// # Errors
///
/// Returns [`ArchiveError::PathTraversal`] for a hostile entry name (fatal
/// for this unpack) and [`ArchiveError::Io`] or [`ArchiveError::Zip`] on
/// read or write failure.
pub fn unpack(archive_path: &Path, dest_dir: &Path) -> ArchiveResult<()> {
    let mut archive = ZipArchive::new(File::open(archive_path)?)?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let target = safe_join(dest_dir, entry.name())?;

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let mtime = stored_mtime(
            entry
                .extra_data_fields()
                .find_map(|field| match field {
                    ExtraField::ExtendedTimestamp(ts) => ts.mod_time(),
                    #[allow(unreachable_patterns)]
                    _ => None,
                }),
            entry.last_modified(),
        );

        let mut output = File::create(&target)?;
        io::copy(&mut entry, &mut output)?;
        drop(output);

        if let Some(mtime) = mtime {
            filetime::set_file_mtime(&target, mtime)?;
        }
    }

    Ok(())
}

/// Builds the archive entry name for `path` relative to `source_dir`.
fn relative_entry_name(source_dir: &Path, path: &Path) -> ArchiveResult<String> {
    let relative = path
        .strip_prefix(source_dir)
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "walked path outside source"))?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

/// Returns a file's mtime as whole seconds since the unix epoch.
///
/// Pre-epoch times clamp to zero; the synchronizer only orders snapshots,
/// it never needs sub-second or pre-1970 precision.
fn file_mtime_secs(metadata: &fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Encodes the extended timestamp extra field: flags byte with the
/// mtime-present bit, then the mtime as a little-endian u32.
///
/// The field is a 32-bit unix timestamp, so pre-epoch times clamp to 0
/// and post-2106 times saturate to `u32::MAX`, preserving relative order
/// at the range ends.
fn extended_timestamp_field(mtime_secs: i64) -> Box<[u8]> {
    let secs = u32::try_from(mtime_secs.clamp(0, i64::from(u32::MAX))).unwrap_or(0);
    let mut field = Vec::with_capacity(5);
    field.push(1u8);
    field.extend_from_slice(&secs.to_le_bytes());
    field.into_boxed_slice()
}

/// Converts an epoch timestamp to the DOS datetime stored in the standard
/// zip header. Out-of-range values (DOS starts at 1980) fall back to the
/// format's default; the extended timestamp field still carries the exact
/// value.
fn dos_datetime(mtime_secs: i64) -> ::zip::DateTime {
    let Some(utc) = DateTime::<Utc>::from_timestamp(mtime_secs, 0) else {
        return ::zip::DateTime::default();
    };
    ::zip::DateTime::from_date_and_time(
        utc.year() as u16,
        utc.month() as u8,
        utc.day() as u8,
        utc.hour() as u8,
        utc.minute() as u8,
        utc.second() as u8,
    )
    .unwrap_or_default()
}

/// Picks the modification time to restore for an extracted entry.
///
/// The extended timestamp field is exact; the DOS time is the fallback for
/// archives produced by other tools.
fn stored_mtime(extended: Option<u32>, dos: Option<::zip::DateTime>) -> Option<FileTime> {
    if let Some(secs) = extended {
        return Some(FileTime::from_unix_time(i64::from(secs), 0));
    }
    let dos = dos?;
    Utc.with_ymd_and_hms(
        i32::from(dos.year()),
        u32::from(dos.month()),
        u32::from(dos.day()),
        u32::from(dos.hour()),
        u32::from(dos.minute()),
        u32::from(dos.second()),
    )
    .single()
    .map(|t| FileTime::from_unix_time(t.timestamp(), 0))
}
