//! Usage: Wall-clock helpers (unix epoch milliseconds, as stored in every table).

use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

pub(crate) fn now_unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
