use std::time::{SystemTime, UNIX_EPOCH};

use chrono::DateTime;

/// Return the current unix timestamp in seconds.
pub fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

/// Render a unix timestamp as `YYYY-MM-DD HH:MM UTC`.
pub fn format_unix_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

#[cfg(test)]
mod tests {
    use super::format_unix_timestamp;

    #[test]
    fn formats_utc_minutes() {
        assert_eq!(format_unix_timestamp(0), "1970-01-01 00:00 UTC");
        assert_eq!(format_unix_timestamp(1_700_000_000), "2023-11-14 22:13 UTC");
    }

    #[test]
    fn out_of_range_is_unknown() {
        assert_eq!(format_unix_timestamp(u64::MAX), "unknown");
    }
}
