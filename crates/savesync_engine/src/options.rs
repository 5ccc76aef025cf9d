//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for sync runs.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Directory for temporary archives while they are packed, uploaded
    /// or extracted. Created on first use; temp archives are removed on
    /// every exit path.
    pub staging_dir: PathBuf,

    /// Quiet period the watcher waits for after a burst of filesystem
    /// events before triggering a sync.
    pub debounce: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            staging_dir: std::env::temp_dir().join("savesync"),
            debounce: Duration::from_secs(5),
        }
    }
}

impl SyncOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the staging directory.
    #[must_use]
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    /// Sets the watcher debounce interval.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}
