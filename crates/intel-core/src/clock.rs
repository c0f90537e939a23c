//! Timestamp helpers (C1).

use chrono::{DateTime, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

/// Thin wrapper so call sites read `Clock::now_iso()` rather than reaching
/// into `chrono`/`std::time` directly; also gives tests a single seam to
/// stub if a fixed clock is ever needed.
pub struct Clock;

impl Clock {
    /// Current instant as an RFC 3339 / ISO-8601 timestamp, UTC.
    pub fn now_iso() -> String {
        Utc::now().to_rfc3339()
    }

    /// Current instant as a `DateTime<Utc>`.
    pub fn now() -> DateTime<Utc> {
        Utc::now()
    }

    /// Nanoseconds since the Unix epoch, for latency math that shouldn't
    /// pay `chrono`'s formatting cost.
    pub fn now_nanos() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before Unix epoch")
            .as_nanos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_iso_parses_back() {
        let ts = Clock::now_iso();
        assert!(DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn now_nanos_monotonic_ish() {
        let a = Clock::now_nanos();
        let b = Clock::now_nanos();
        assert!(b >= a);
    }
}
