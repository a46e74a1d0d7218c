//! Wall-clock helpers shared by the pipeline and persistence layer.
//!
//! Readings carry both a unix-millisecond timestamp (authoritative, used for
//! range queries) and a human-readable ISO-8601 string for display and
//! persisted records.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as milliseconds since the Unix epoch.
pub fn unix_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Current local hour of day (0-23), derived from UTC.
pub fn current_hour() -> u8 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    ((secs / 3600) % 24) as u8
}

/// Format milliseconds-since-epoch as a full ISO-8601 timestamp.
/// Example: `2026-02-15T01:30:00Z`
pub fn format_iso8601(unix_ms: u64) -> String {
    let secs = unix_ms / 1000;
    let (year, month, day, hour, min, sec) = secs_to_utc(secs);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year, month, day, hour, min, sec
    )
}

/// Convert seconds since Unix epoch to (year, month, day, hour, minute, second) UTC.
/// No leap second handling.
fn secs_to_utc(secs: u64) -> (u64, u64, u64, u64, u64, u64) {
    let sec = secs % 60;
    let min = (secs / 60) % 60;
    let hour = (secs / 3600) % 24;

    let mut days = secs / 86400;
    let mut year = 1970u64;

    loop {
        let days_in_year = if is_leap(year) { 366 } else { 365 };
        if days < days_in_year {
            break;
        }
        days -= days_in_year;
        year += 1;
    }

    let month_days: [u64; 12] = if is_leap(year) {
        [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    } else {
        [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    };

    let mut month = 1u64;
    for len in month_days {
        if days < len {
            break;
        }
        days -= len;
        month += 1;
    }

    (year, month, days + 1, hour, min, sec)
}

fn is_leap(year: u64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_formats_to_1970() {
        assert_eq!(format_iso8601(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_known_timestamp() {
        // 2024-02-29T12:30:45Z, a leap day.
        assert_eq!(format_iso8601(1_709_209_845_000), "2024-02-29T12:30:45Z");
    }

    #[test]
    fn test_year_boundary() {
        // 2023-12-31T23:59:59Z
        assert_eq!(format_iso8601(1_704_067_199_000), "2023-12-31T23:59:59Z");
    }

    #[test]
    fn test_unix_ms_now_is_recent() {
        // After 2020-01-01 and before 2100.
        let now = unix_ms_now();
        assert!(now > 1_577_836_800_000);
        assert!(now < 4_102_444_800_000);
    }

    #[test]
    fn test_current_hour_in_range() {
        assert!(current_hour() < 24);
    }
}
