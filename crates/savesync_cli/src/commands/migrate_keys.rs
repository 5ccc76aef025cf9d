//! Migrate-keys command implementation.
//!
//! Early deployments stamped snapshot keys with RFC 3339 timestamps
//! (`item/2023-06-01T12:00:00Z.zip`). Those sort incorrectly against the
//! compact format and contain characters some stores dislike. This
//! command renames every legacy key in place to the compact form.

use chrono::{DateTime, Utc};
use savesync_engine::stamp;
use savesync_transport::Transport;
use std::sync::Arc;

/// Renames legacy RFC 3339 snapshot keys to the compact stamp format.
pub fn run(
    transport: &Arc<dyn Transport>,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let keys: Vec<String> = transport.list("").collect::<Result<_, _>>()?;

    let mut renamed = 0usize;
    let mut skipped = 0usize;
    for key in &keys {
        match migrated_key(key) {
            Some(new_key) => {
                if dry_run {
                    println!("  would rename {key} -> {new_key}");
                } else {
                    transport.rename(key, &new_key)?;
                    println!("  renamed {key} -> {new_key}");
                }
                renamed += 1;
            }
            None => skipped += 1,
        }
    }

    println!(
        "{} {} key(s), {} already current or unrecognized",
        if dry_run { "Would rename" } else { "Renamed" },
        renamed,
        skipped
    );
    Ok(())
}

/// The compact-format key a legacy key should be renamed to, or `None`
/// when the key is already current or not a recognizable snapshot.
fn migrated_key(key: &str) -> Option<String> {
    let stem = key.strip_suffix(stamp::ARCHIVE_SUFFIX)?;
    let (prefix, name) = match stem.rsplit_once('/') {
        Some((dir, name)) => (format!("{dir}/"), name),
        None => (String::new(), stem),
    };
    if stamp::decode(name).is_ok() {
        return None;
    }
    let at: DateTime<Utc> = DateTime::parse_from_rfc3339(name).ok()?.with_timezone(&Utc);
    Some(format!(
        "{prefix}{}{}",
        stamp::encode(at),
        stamp::ARCHIVE_SUFFIX
    ))
}
