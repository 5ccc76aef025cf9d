//! Snapshot timestamp encoding and key naming.
//!
//! A snapshot key is `"<item name>/<stamp>.zip"` where the stamp is the
//! capture time encoded as 14 UTC digits, `YYYYMMDDHHMMSS`. The encoding
//! is fixed-width with no separators, so lexicographic order on encoded
//! stamps equals chronological order and "most recent" never requires
//! parsing every candidate.

use crate::error::{SyncError, SyncResult};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Suffix of every snapshot key.
pub const ARCHIVE_SUFFIX: &str = ".zip";

const STAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const STAMP_WIDTH: usize = 14;

/// Encodes a point in time as a 14-digit UTC stamp.
///
/// Sub-second precision is dropped; snapshots are ordered to the second.
pub fn encode(at: DateTime<Utc>) -> String {
    at.format(STAMP_FORMAT).to_string()
}

/// Decodes a 14-digit UTC stamp.
///
/// # Errors
///
/// Returns [`SyncError::MalformedTimestamp`] when the input has the wrong
/// width, contains a non-digit, or names an invalid calendar date. Callers
/// walking a remote listing must treat this as "ignore the key": a foreign
/// or corrupted key never aborts a sync.
pub fn decode(value: &str) -> SyncResult<DateTime<Utc>> {
    if value.len() != STAMP_WIDTH || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SyncError::malformed_timestamp(value));
    }
    NaiveDateTime::parse_from_str(value, STAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| SyncError::malformed_timestamp(value))
}

/// Builds the remote key for a snapshot of `name` captured at `at`.
pub fn snapshot_key(name: &str, at: DateTime<Utc>) -> String {
    format!("{name}/{}{ARCHIVE_SUFFIX}", encode(at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn encodes_fixed_width_utc() {
        assert_eq!(encode(at(2024, 1, 1, 0, 0, 0)), "20240101000000");
        assert_eq!(encode(at(1999, 12, 31, 23, 59, 59)), "19991231235959");
    }

    #[test]
    fn decode_round_trips() {
        let t = at(2024, 6, 15, 12, 30, 45);
        assert_eq!(decode(&encode(t)).unwrap(), t);
    }

    #[test]
    fn decode_rejects_malformed_input() {
        for value in [
            "",
            "2024",
            "20240101000000Z",
            "2024-01-01T0000",
            "2024010100000x",
            "20241301000000", // month 13
            "20240132000000", // day 32
            "99999999999999",
        ] {
            assert!(
                matches!(decode(value), Err(SyncError::MalformedTimestamp { .. })),
                "expected malformed for {value:?}"
            );
        }
    }

    #[test]
    fn snapshot_keys_embed_the_stamp() {
        let key = snapshot_key("elden-ring", at(2024, 1, 1, 0, 0, 0));
        assert_eq!(key, "elden-ring/20240101000000.zip");
    }

    proptest! {
        /// Encoded stamps compare as strings exactly like their times.
        #[test]
        fn encoding_preserves_order(a in 0i64..32_503_680_000, b in 0i64..32_503_680_000) {
            let ta = DateTime::<Utc>::from_timestamp(a, 0).unwrap();
            let tb = DateTime::<Utc>::from_timestamp(b, 0).unwrap();
            prop_assert_eq!(ta.cmp(&tb), encode(ta).cmp(&encode(tb)));
        }

        /// Every representable stamp survives a round-trip.
        #[test]
        fn encoding_round_trips(secs in 0i64..32_503_680_000) {
            let t = DateTime::<Utc>::from_timestamp(secs, 0).unwrap();
            prop_assert_eq!(decode(&encode(t)).unwrap(), t);
        }
    }
}
