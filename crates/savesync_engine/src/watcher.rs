//! Debounced filesystem watcher.
//!
//! Watches the tracked items' directories and re-syncs an item after its
//! files stop changing. Games write saves in bursts (many files, several
//! seconds apart), so a sync is only triggered once an item has been
//! quiet for the configured debounce interval. While the item's game
//! process is still running the sync is deferred further; saves are
//! captured after the game exits, not mid-session.

use crate::error::SyncResult;
use crate::item::TrackedItem;
use crate::orchestrator::SyncOrchestrator;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Answers whether a process with a given executable name is running.
///
/// Seam for tests; production code uses [`SystemProcessProbe`].
pub trait ProcessProbe: Send + Sync {
    /// True when a process whose name matches `process` is running.
    fn is_running(&self, process: &str) -> bool;
}

/// Probes the live process table.
pub struct SystemProcessProbe {
    system: parking_lot::Mutex<sysinfo::System>,
}

impl SystemProcessProbe {
    /// Creates a probe.
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: parking_lot::Mutex::new(sysinfo::System::new()),
        }
    }
}

impl Default for SystemProcessProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe for SystemProcessProbe {
    fn is_running(&self, process: &str) -> bool {
        let mut system = self.system.lock();
        system.refresh_processes();
        system
            .processes()
            .values()
            .any(|p| p.name().eq_ignore_ascii_case(process))
    }
}

/// Watches tracked items and syncs them when they go quiet.
///
/// The run loop is single-threaded: events are drained from the notify
/// channel, dirty items are tracked with their last-event time, and an
/// item is synced once it has been quiet for the debounce interval and
/// its game process (if any) is not running. Per-item failures are
/// logged and the item stays dirty, so the sync is retried on the next
/// pass.
pub struct SaveWatcher {
    orchestrator: Arc<SyncOrchestrator>,
    items: Vec<TrackedItem>,
    probe: Box<dyn ProcessProbe>,
    debounce: Duration,
    cancelled: AtomicBool,
}

/// How often the run loop wakes up to re-check quiet dirty items and the
/// cancellation flag when no events arrive.
const TICK: Duration = Duration::from_millis(250);

impl SaveWatcher {
    /// Creates a watcher over the given items.
    pub fn new(
        orchestrator: Arc<SyncOrchestrator>,
        items: Vec<TrackedItem>,
        probe: Box<dyn ProcessProbe>,
        debounce: Duration,
    ) -> Self {
        Self {
            orchestrator,
            items,
            probe,
            debounce,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Requests the run loop to stop. Takes effect within one tick.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Runs until [`cancel`](Self::cancel) is called.
    ///
    /// Every item is synced once up front, then re-synced whenever its
    /// directory changes and settles. Items whose directory is missing
    /// are still watched for by the initial sync's skip outcome but get
    /// no filesystem watch; they are picked up once the directory exists
    /// and a restart re-registers the watches.
    ///
    /// # Errors
    ///
    /// Fails only when the filesystem watcher itself cannot be set up.
    /// Sync failures inside the loop are logged, not propagated.
    pub fn run(&self) -> SyncResult<()> {
        for item in &self.items {
            self.sync_and_log(item);
        }

        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(move |event| {
            // A send failure means the run loop is gone; nothing to do.
            let _ = tx.send(event);
        })?;
        for item in &self.items {
            if item.dir.is_dir() {
                watcher.watch(&item.dir, RecursiveMode::Recursive)?;
                tracing::debug!(item = %item.name, dir = %item.dir.display(), "watching");
            } else {
                tracing::warn!(item = %item.name, dir = %item.dir.display(), "directory missing, not watched");
            }
        }

        // Index of dirty items to the instant of their last event.
        let mut dirty: HashMap<usize, Instant> = HashMap::new();

        while !self.cancelled.load(Ordering::SeqCst) {
            match rx.recv_timeout(TICK) {
                Ok(Ok(event)) => {
                    if is_change(&event.kind) {
                        let now = Instant::now();
                        for index in self.touched_items(&event) {
                            dirty.insert(index, now);
                        }
                    }
                }
                Ok(Err(err)) => {
                    tracing::warn!(%err, "watch event error");
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }

            let now = Instant::now();
            dirty.retain(|&index, last_event| {
                if now.duration_since(*last_event) < self.debounce {
                    return true;
                }
                let item = &self.items[index];
                if let Some(process) = &item.process {
                    if self.probe.is_running(process) {
                        tracing::debug!(item = %item.name, process, "process running, deferring sync");
                        // Re-arm so the next check waits a full interval.
                        *last_event = now;
                        return true;
                    }
                }
                !self.sync_and_log(item)
            });
        }

        tracing::info!("watcher stopped");
        Ok(())
    }

    /// Indices of the items whose directory contains any of the event's
    /// paths.
    fn touched_items(&self, event: &Event) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| event.paths.iter().any(|p| p.starts_with(&item.dir)))
            .map(|(index, _)| index)
            .collect()
    }

    /// Syncs one item, logging the result. Returns true on success.
    fn sync_and_log(&self, item: &TrackedItem) -> bool {
        match self.orchestrator.sync_item(item) {
            Ok(outcome) => {
                tracing::debug!(item = %item.name, ?outcome, "sync finished");
                true
            }
            Err(err) => {
                tracing::error!(item = %item.name, %err, "sync failed");
                false
            }
        }
    }
}

fn is_change(kind: &EventKind) -> bool {
    // Removals are ignored: deleting files does not advance any mtime, so
    // a sync triggered by one would re-download the state just deleted.
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}
