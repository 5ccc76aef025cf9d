//! In-memory transport for tests.

use crate::error::{TransportError, TransportResult};
use crate::transport::{error_stream, KeyStream, Transport};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// An in-memory transport for testing.
///
/// Stores objects in a map and supports failure injection per operation,
/// so the sync engine's error paths can be exercised without a network.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_uploads: AtomicBool,
    fail_downloads: AtomicBool,
    fail_listing: AtomicBool,
}

impl MemoryTransport {
    /// Creates an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a remote object.
    pub fn insert(&self, key: impl Into<String>, bytes: Vec<u8>) {
        self.objects.lock().insert(key.into(), bytes);
    }

    /// Returns the stored bytes for a key, if present.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().get(key).cloned()
    }

    /// Returns every stored key in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().keys().cloned().collect()
    }

    /// Makes subsequent uploads fail.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent downloads fail.
    pub fn fail_downloads(&self, fail: bool) {
        self.fail_downloads.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent listings fail.
    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }
}

impl Transport for MemoryTransport {
    fn upload(&self, local: &Path, key: &str) -> TransportResult<()> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(TransportError::remote("upload", key, "injected failure"));
        }
        let bytes = fs::read(local)?;
        self.objects.lock().insert(key.to_owned(), bytes);
        Ok(())
    }

    fn download(&self, key: &str, local: &Path) -> TransportResult<()> {
        if self.fail_downloads.load(Ordering::SeqCst) {
            return Err(TransportError::remote("download", key, "injected failure"));
        }
        let bytes = self
            .objects
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| TransportError::remote("download", key, "no such key"))?;
        fs::write(local, bytes)?;
        Ok(())
    }

    fn list(&self, prefix: &str) -> KeyStream<'_> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return error_stream(TransportError::remote("list", prefix, "injected failure"));
        }
        let keys: Vec<String> = self
            .objects
            .lock()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        Box::new(keys.into_iter().map(Ok))
    }

    fn rename(&self, old_key: &str, new_key: &str) -> TransportResult<()> {
        let mut objects = self.objects.lock();
        let bytes = objects
            .remove(old_key)
            .ok_or_else(|| TransportError::remote("rename", old_key, "no such key"))?;
        objects.insert(new_key.to_owned(), bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn upload_download_round_trip() {
        let dir = tempdir().unwrap();
        let local = dir.path().join("a.zip");
        fs::write(&local, b"archive bytes").unwrap();

        let transport = MemoryTransport::new();
        transport.upload(&local, "item/a.zip").unwrap();
        assert_eq!(transport.get("item/a.zip").unwrap(), b"archive bytes");

        let restored = dir.path().join("b.zip");
        transport.download("item/a.zip", &restored).unwrap();
        assert_eq!(fs::read(&restored).unwrap(), b"archive bytes");
    }

    #[test]
    fn list_filters_by_prefix() {
        let transport = MemoryTransport::new();
        transport.insert("alpha/1.zip", vec![]);
        transport.insert("alpha/2.zip", vec![]);
        transport.insert("beta/1.zip", vec![]);

        let keys: Vec<String> = transport
            .list("alpha/")
            .collect::<TransportResult<_>>()
            .unwrap();
        assert_eq!(keys, vec!["alpha/1.zip", "alpha/2.zip"]);
    }

    #[test]
    fn listing_failure_surfaces_on_the_stream() {
        let transport = MemoryTransport::new();
        transport.insert("alpha/1.zip", vec![]);
        transport.fail_listing(true);

        let mut stream = transport.list("alpha/");
        assert!(stream.next().unwrap().is_err());
        assert!(stream.next().is_none());
    }

    #[test]
    fn rename_moves_the_object() {
        let transport = MemoryTransport::new();
        transport.insert("old.zip", b"x".to_vec());
        transport.rename("old.zip", "new.zip").unwrap();
        assert!(transport.get("old.zip").is_none());
        assert_eq!(transport.get("new.zip").unwrap(), b"x");

        assert!(transport.rename("missing", "other").is_err());
    }
}
