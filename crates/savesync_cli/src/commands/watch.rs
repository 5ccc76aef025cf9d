//! Watch command implementation.

use savesync_engine::{SaveWatcher, SyncOrchestrator, SystemProcessProbe, TrackedItem};
use std::sync::Arc;
use std::time::Duration;

/// Runs the watcher until the process is terminated.
pub fn run(
    orchestrator: Arc<SyncOrchestrator>,
    items: Vec<TrackedItem>,
    debounce: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    if items.is_empty() {
        return Err("no items configured; nothing to watch".into());
    }

    println!(
        "Watching {} item(s), syncing after {}s of quiet",
        items.len(),
        debounce.as_secs()
    );
    let watcher = SaveWatcher::new(
        orchestrator,
        items,
        Box::new(SystemProcessProbe::new()),
        debounce,
    );
    watcher.run()?;
    Ok(())
}
