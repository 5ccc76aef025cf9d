//! Tracked item description.

use std::path::PathBuf;

/// One save directory under synchronization.
///
/// The `name` doubles as the remote namespace: every snapshot of this item
/// lives under the `"<name>/"` key prefix. How the directory is discovered
/// (static configuration, platform folder lookup) is the caller's concern;
/// the engine only consumes the resulting pair. Immutable for the duration
/// of a sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedItem {
    /// Logical name and remote namespace prefix.
    pub name: String,
    /// Local save directory.
    pub dir: PathBuf,
    /// Executable name of the game, when known. The watcher defers syncs
    /// while a process with this name is running.
    pub process: Option<String>,
}

impl TrackedItem {
    /// Creates a tracked item.
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            process: None,
        }
    }

    /// Sets the process name to watch for.
    #[must_use]
    pub fn with_process(mut self, process: impl Into<String>) -> Self {
        self.process = Some(process.into());
        self
    }

    /// The remote key prefix of this item's snapshots.
    pub fn prefix(&self) -> String {
        format!("{}/", self.name)
    }
}
