//! Per-item sync execution.

use crate::decision::decide;
use crate::error::SyncResult;
use crate::item::TrackedItem;
use crate::local::local_save_time;
use crate::options::SyncOptions;
use crate::stamp;
use savesync_archive::{pack, unpack};
use savesync_transport::Transport;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// What happened to one tracked item during a sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The local directory does not exist; nothing was synchronized.
    SkippedMissingDir,
    /// Local and remote already agree (or both are empty).
    Unchanged,
    /// At least one transfer happened.
    Synced {
        /// Key of the snapshot uploaded from the local directory.
        uploaded: Option<String>,
        /// Key of the remote snapshot extracted over the local directory.
        downloaded: Option<String>,
    },
}

/// Drives one tracked item end to end.
///
/// The flow per item is: compute local state, list the item's remote
/// prefix, decide, then execute the upload and/or download. There are no
/// retries at this layer and the decision is computed once from a single
/// listing; remote writes that land between listing and transfer are
/// resolved by the next run (last writer wins).
///
/// # Caller contract
///
/// Items are independent: a failure on one item must not stop the driver
/// from processing the rest, and at most one sync may run per item at a
/// time. Both are the caller's responsibility; [`SyncOrchestrator`] only
/// runs the item it is given.
pub struct SyncOrchestrator {
    transport: Arc<dyn Transport>,
    options: SyncOptions,
}

impl SyncOrchestrator {
    /// Creates an orchestrator over the given transport.
    pub fn new(transport: Arc<dyn Transport>, options: SyncOptions) -> Self {
        Self { transport, options }
    }

    /// Synchronizes one tracked item, returning its outcome.
    ///
    /// # Errors
    ///
    /// A pack, unpack or transfer failure aborts this item and is
    /// reported to the caller; the temp archive is removed on every exit
    /// path. If the live directory was already cleared when an unpack
    /// fails, the item is left partially restored - the next successful
    /// download repairs it.
    pub fn sync_item(&self, item: &TrackedItem) -> SyncResult<SyncOutcome> {
        if !item.dir.is_dir() {
            tracing::warn!(item = %item.name, dir = %item.dir.display(), "directory missing, skipping");
            return Ok(SyncOutcome::SkippedMissingDir);
        }

        let local_time = local_save_time(&item.dir)?;
        let prefix = item.prefix();
        let decision = decide(local_time, &prefix, self.transport.list(&prefix))?;
        tracing::debug!(
            item = %item.name,
            upload = decision.upload_at.is_some(),
            download = decision.download_key.as_deref().unwrap_or("-"),
            "decision"
        );

        let mut uploaded = None;
        if let Some(at) = decision.upload_at {
            let key = stamp::snapshot_key(&item.name, at);
            self.upload_snapshot(item, &key)?;
            uploaded = Some(key);
        }

        let mut downloaded = None;
        if let Some(key) = decision.download_key {
            self.download_snapshot(item, &key)?;
            downloaded = Some(key);
        }

        if uploaded.is_none() && downloaded.is_none() {
            tracing::info!(item = %item.name, "unchanged");
            Ok(SyncOutcome::Unchanged)
        } else {
            Ok(SyncOutcome::Synced {
                uploaded,
                downloaded,
            })
        }
    }

    /// Packs the item's directory and uploads it under `key`.
    fn upload_snapshot(&self, item: &TrackedItem, key: &str) -> SyncResult<()> {
        let staging = self.staging_path(item)?;
        let _cleanup = TempArchive(staging.clone());

        pack(&item.dir, &staging)?;
        self.transport.upload(&staging, key)?;
        tracing::info!(item = %item.name, key, "uploaded snapshot");
        Ok(())
    }

    /// Downloads `key` and extracts it over the item's directory.
    fn download_snapshot(&self, item: &TrackedItem, key: &str) -> SyncResult<()> {
        let staging = self.staging_path(item)?;
        remove_if_present(&staging)?;
        let _cleanup = TempArchive(staging.clone());

        self.transport.download(key, &staging)?;

        // The live directory is replaced wholesale. Clearing it before the
        // unpack means a failed unpack leaves a partial restore; that is
        // the documented trade-off for never merging old and new state.
        if item.dir.exists() {
            fs::remove_dir_all(&item.dir)?;
        }
        fs::create_dir_all(&item.dir)?;
        unpack(&staging, &item.dir)?;
        tracing::info!(item = %item.name, key, "downloaded snapshot");
        Ok(())
    }

    fn staging_path(&self, item: &TrackedItem) -> SyncResult<PathBuf> {
        fs::create_dir_all(&self.options.staging_dir)?;
        Ok(self
            .options
            .staging_dir
            .join(format!("{}{}", item.name, stamp::ARCHIVE_SUFFIX)))
    }
}

/// Removes the temp archive when the transfer scope exits, on success and
/// failure alike. Absence is not an error.
struct TempArchive(PathBuf);

impl Drop for TempArchive {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.0) {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.0.display(), %err, "failed to remove temp archive");
            }
        }
    }
}

fn remove_if_present(path: &PathBuf) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use filetime::FileTime;
    use savesync_transport::MemoryTransport;
    use std::path::Path;
    use tempfile::tempdir;

    struct Fixture {
        _root: tempfile::TempDir,
        transport: Arc<MemoryTransport>,
        orchestrator: SyncOrchestrator,
        item: TrackedItem,
    }

    fn fixture() -> Fixture {
        let root = tempdir().unwrap();
        let dir = root.path().join("saves");
        fs::create_dir_all(&dir).unwrap();
        let transport = Arc::new(MemoryTransport::new());
        let orchestrator = SyncOrchestrator::new(
            transport.clone(),
            SyncOptions::new().with_staging_dir(root.path().join("staging")),
        );
        Fixture {
            item: TrackedItem::new("item", dir),
            _root: root,
            transport,
            orchestrator,
        }
    }

    fn write_save(dir: &Path, name: &str, contents: &[u8], mtime_secs: i64) {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        filetime::set_file_mtime(&path, FileTime::from_unix_time(mtime_secs, 0)).unwrap();
    }

    /// Packs a throwaway directory into archive bytes for seeding the
    /// remote store.
    fn archive_bytes(files: &[(&str, &[u8], i64)]) -> Vec<u8> {
        let dir = tempdir().unwrap();
        for (name, contents, mtime) in files {
            write_save(dir.path(), name, contents, *mtime);
        }
        let staging = tempdir().unwrap();
        let out = staging.path().join("out.zip");
        pack(dir.path(), &out).unwrap();
        fs::read(&out).unwrap()
    }

    #[test]
    fn empty_local_and_remote_is_unchanged() {
        let fx = fixture();
        let outcome = fx.orchestrator.sync_item(&fx.item).unwrap();
        assert_eq!(outcome, SyncOutcome::Unchanged);
        assert!(fx.transport.keys().is_empty());
    }

    #[test]
    fn fresh_local_state_is_uploaded_under_its_mtime() {
        let fx = fixture();
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        write_save(&fx.item.dir, "save.dat", b"progress", t.timestamp());

        let outcome = fx.orchestrator.sync_item(&fx.item).unwrap();
        assert_eq!(
            outcome,
            SyncOutcome::Synced {
                uploaded: Some("item/20240101000000.zip".to_owned()),
                downloaded: None,
            }
        );
        assert_eq!(fx.transport.keys(), vec!["item/20240101000000.zip"]);
    }

    #[test]
    fn matching_snapshot_plus_newer_one_downloads_only() {
        let fx = fixture();
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        write_save(&fx.item.dir, "save.dat", b"old progress", t.timestamp());

        // Remote already has the matching snapshot and a one-hour-newer one.
        let newer_mtime = t.timestamp() + 3600;
        fx.transport.insert(
            "item/20240101000000.zip",
            archive_bytes(&[("save.dat", b"old progress", t.timestamp())]),
        );
        fx.transport.insert(
            "item/20240101010000.zip",
            archive_bytes(&[("save.dat", b"new progress", newer_mtime)]),
        );

        let outcome = fx.orchestrator.sync_item(&fx.item).unwrap();
        assert_eq!(
            outcome,
            SyncOutcome::Synced {
                uploaded: None,
                downloaded: Some("item/20240101010000.zip".to_owned()),
            }
        );
        assert_eq!(
            fs::read(fx.item.dir.join("save.dat")).unwrap(),
            b"new progress"
        );
        // The restored mtime converges with the downloaded snapshot.
        let local = local_save_time(&fx.item.dir).unwrap().unwrap();
        assert_eq!(local.timestamp(), newer_mtime);
    }

    #[test]
    fn empty_local_directory_restores_the_newest_snapshot() {
        let fx = fixture();
        fx.transport.insert(
            "item/20230601000000.zip",
            archive_bytes(&[("a.dat", b"first", 1_685_577_600)]),
        );
        fx.transport.insert(
            "item/20240101000000.zip",
            archive_bytes(&[("b.dat", b"second", 1_704_067_200)]),
        );

        let outcome = fx.orchestrator.sync_item(&fx.item).unwrap();
        assert_eq!(
            outcome,
            SyncOutcome::Synced {
                uploaded: None,
                downloaded: Some("item/20240101000000.zip".to_owned()),
            }
        );
        assert!(fx.item.dir.join("b.dat").is_file());
        assert!(!fx.item.dir.join("a.dat").exists());
    }

    #[test]
    fn missing_directory_is_skipped() {
        let fx = fixture();
        let missing = TrackedItem::new("ghost", fx.item.dir.join("does-not-exist"));
        let outcome = fx.orchestrator.sync_item(&missing).unwrap();
        assert_eq!(outcome, SyncOutcome::SkippedMissingDir);
    }

    #[test]
    fn upload_failure_is_reported_and_cleans_the_temp_archive() {
        let fx = fixture();
        write_save(&fx.item.dir, "save.dat", b"x", 1_700_000_000);
        fx.transport.fail_uploads(true);

        assert!(fx.orchestrator.sync_item(&fx.item).is_err());
        let staging = fx.orchestrator.staging_path(&fx.item).unwrap();
        assert!(!staging.exists());
        // Local state is untouched.
        assert!(fx.item.dir.join("save.dat").is_file());
    }

    #[test]
    fn download_failure_leaves_local_state_untouched() {
        let fx = fixture();
        fx.transport
            .insert("item/20240101000000.zip", b"ignored".to_vec());
        fx.transport.fail_downloads(true);

        assert!(fx.orchestrator.sync_item(&fx.item).is_err());
        // The directory was never cleared because the download failed
        // before the replace step.
        assert!(fx.item.dir.is_dir());
    }

    #[test]
    fn listing_failure_aborts_before_any_transfer() {
        let fx = fixture();
        write_save(&fx.item.dir, "save.dat", b"x", 1_700_000_000);
        fx.transport.fail_listing(true);

        assert!(fx.orchestrator.sync_item(&fx.item).is_err());
        assert!(fx.transport.keys().is_empty());
    }
}
