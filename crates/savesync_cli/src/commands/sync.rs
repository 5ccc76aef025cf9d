//! Sync command implementation.

use savesync_engine::{SyncOrchestrator, SyncOutcome, TrackedItem};
use std::sync::Arc;

/// Runs one sync pass over the given items.
///
/// Items are independent: a failure on one is reported and the rest are
/// still processed. The command fails when any item failed.
pub fn run(
    orchestrator: &Arc<SyncOrchestrator>,
    items: &[TrackedItem],
) -> Result<(), Box<dyn std::error::Error>> {
    if items.is_empty() {
        println!("No items configured; nothing to do");
        return Ok(());
    }

    let mut failures = 0usize;
    for item in items {
        match orchestrator.sync_item(item) {
            Ok(SyncOutcome::SkippedMissingDir) => {
                println!("  {} skipped (directory missing)", item.name);
            }
            Ok(SyncOutcome::Unchanged) => {
                println!("  {} unchanged", item.name);
            }
            Ok(SyncOutcome::Synced {
                uploaded,
                downloaded,
            }) => {
                if let Some(key) = uploaded {
                    println!("  {} uploaded {}", item.name, key);
                }
                if let Some(key) = downloaded {
                    println!("  {} downloaded {}", item.name, key);
                }
            }
            Err(err) => {
                failures += 1;
                tracing::error!(item = %item.name, %err, "sync failed");
                println!("  {} FAILED: {}", item.name, err);
            }
        }
    }

    if failures == 0 {
        Ok(())
    } else {
        Err(format!("{failures} of {} items failed to sync", items.len()).into())
    }
}
