//! The sync decision algorithm.

use crate::error::SyncResult;
use crate::stamp::{self, ARCHIVE_SUFFIX};
use chrono::{DateTime, Utc};
use savesync_transport::TransportResult;

/// What to do for one tracked item.
///
/// Upload and download are independent decisions, not alternatives: a
/// single pass can both upload the local state and fetch a newer remote
/// snapshot written concurrently by another machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncDecision {
    /// When set, upload the local directory as a snapshot captured at
    /// this time. Present only when local state exists and no remote
    /// snapshot matches it to the second.
    pub upload_at: Option<DateTime<Utc>>,
    /// When set, the single most recent remote snapshot strictly newer
    /// than local state (or the newest overall when there is no local
    /// state); download it over the local directory.
    pub download_key: Option<String>,
}

impl SyncDecision {
    /// True when there is nothing to transfer.
    pub fn is_noop(&self) -> bool {
        self.upload_at.is_none() && self.download_key.is_none()
    }
}

/// Decides the action for one tracked item.
///
/// `local_time` is the item's newest local mtime (absent when the
/// directory holds no files) and `keys` is the unfiltered remote listing
/// under the item's `prefix`.
///
/// For each listed key: keys without the archive suffix are skipped; the
/// prefix and suffix are stripped and the rest decoded as a stamp, with
/// undecodable stamps logged and skipped. A stamp equal to `local_time`
/// to the second suppresses the upload - checked for every key, so
/// convergence holds regardless of listing order. A stamp strictly newer
/// than the best candidate so far becomes the download choice.
///
/// # Errors
///
/// A listing failure aborts the decision; partial listings must not
/// produce half-informed decisions.
pub fn decide<I>(
    local_time: Option<DateTime<Utc>>,
    prefix: &str,
    keys: I,
) -> SyncResult<SyncDecision>
where
    I: IntoIterator<Item = TransportResult<String>>,
{
    let mut upload_at = local_time;
    let mut download_key = None;
    let mut download_time = local_time;

    for key in keys {
        let key = key?;
        let Some(stem) = key.strip_suffix(ARCHIVE_SUFFIX) else {
            continue;
        };
        let stem = stem.strip_prefix(prefix).unwrap_or(stem);
        let remote_time = match stamp::decode(stem) {
            Ok(at) => at,
            Err(err) => {
                tracing::warn!(%key, %err, "ignoring undecodable snapshot key");
                continue;
            }
        };

        if local_time.is_some_and(|at| at == remote_time) {
            // Convergence: a snapshot of the current local state already
            // exists remotely.
            upload_at = None;
        } else if download_time.map_or(true, |at| remote_time > at) {
            download_key = Some(key.clone());
            download_time = Some(remote_time);
        }
    }

    Ok(SyncDecision {
        upload_at,
        download_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const PREFIX: &str = "item/";

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn key_at(t: DateTime<Utc>) -> String {
        stamp::snapshot_key("item", t)
    }

    fn ok_keys(keys: &[String]) -> Vec<TransportResult<String>> {
        keys.iter().cloned().map(Ok).collect()
    }

    #[test]
    fn nothing_local_nothing_remote_is_a_noop() {
        let decision = decide(None, PREFIX, ok_keys(&[])).unwrap();
        assert!(decision.is_noop());
    }

    #[test]
    fn local_only_uploads() {
        let t = at(1_700_000_000);
        let decision = decide(Some(t), PREFIX, ok_keys(&[])).unwrap();
        assert_eq!(decision.upload_at, Some(t));
        assert_eq!(decision.download_key, None);
    }

    #[test]
    fn exact_match_suppresses_upload() {
        let t = at(1_700_000_000);
        let decision = decide(Some(t), PREFIX, ok_keys(&[key_at(t)])).unwrap();
        assert!(decision.is_noop());
    }

    #[test]
    fn match_suppresses_upload_regardless_of_order() {
        let t = at(1_700_000_000);
        let older = key_at(at(1_600_000_000));
        // Matching key listed first, then last.
        for keys in [
            vec![key_at(t), older.clone()],
            vec![older.clone(), key_at(t)],
        ] {
            let decision = decide(Some(t), PREFIX, ok_keys(&keys)).unwrap();
            assert!(decision.is_noop(), "keys: {keys:?}");
        }
    }

    #[test]
    fn no_local_state_downloads_the_newest() {
        let keys = ok_keys(&[
            key_at(at(1_000)),
            key_at(at(3_000)),
            key_at(at(2_000)),
        ]);
        let decision = decide(None, PREFIX, keys).unwrap();
        assert_eq!(decision.upload_at, None);
        assert_eq!(decision.download_key, Some(key_at(at(3_000))));
    }

    #[test]
    fn newer_remote_triggers_both_upload_and_download() {
        // Local at t, remote only at t+1s: the match rule is exact, so
        // the upload still happens, and the newer snapshot is fetched.
        let t = at(1_700_000_000);
        let newer = key_at(at(1_700_000_001));
        let decision = decide(Some(t), PREFIX, ok_keys(&[newer.clone()])).unwrap();
        assert_eq!(decision.upload_at, Some(t));
        assert_eq!(decision.download_key, Some(newer));
    }

    #[test]
    fn exact_match_plus_newer_key_downloads_without_upload() {
        let t = at(1_700_000_000);
        let newer = key_at(at(1_700_003_600));
        let decision =
            decide(Some(t), PREFIX, ok_keys(&[key_at(t), newer.clone()])).unwrap();
        assert_eq!(decision.upload_at, None);
        assert_eq!(decision.download_key, Some(newer));
    }

    #[test]
    fn older_remote_snapshots_are_ignored() {
        let t = at(1_700_000_000);
        let decision =
            decide(Some(t), PREFIX, ok_keys(&[key_at(at(1_600_000_000))])).unwrap();
        assert_eq!(decision.upload_at, Some(t));
        assert_eq!(decision.download_key, None);
    }

    #[test]
    fn foreign_keys_are_skipped_not_fatal() {
        let t = at(1_700_000_000);
        let keys = ok_keys(&[
            "item/readme.txt".to_owned(),
            "item/not-a-stamp.zip".to_owned(),
            "item/2024.zip".to_owned(),
        ]);
        let decision = decide(Some(t), PREFIX, keys).unwrap();
        // Nothing decodable: upload only.
        assert_eq!(decision.upload_at, Some(t));
        assert_eq!(decision.download_key, None);
    }

    #[test]
    fn listing_failure_aborts_the_decision() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let keys: Vec<TransportResult<String>> = vec![
            Ok(key_at(at(1_000))),
            Err(savesync_transport::TransportError::remote(
                "list",
                PREFIX,
                "connection reset",
            )),
        ];
        assert!(decide(Some(t), PREFIX, keys).is_err());
    }
}
