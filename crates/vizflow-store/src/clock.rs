//! Timestamps as stored in index rows and record headers: ISO-8601 with an
//! explicit UTC offset.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};

/// Current local time with its offset.
pub fn now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339()
}

/// Parse an ISO-8601 timestamp. A value without an offset is read as local
/// time.
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts);
    }
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|ts| ts.fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_offset() {
        let ts = parse_timestamp("2025-03-01T10:20:30.5+09:00").unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 9 * 3600);
        assert_eq!(format_timestamp(&ts), "2025-03-01T10:20:30.500+09:00");
    }

    #[test]
    fn test_parse_zulu() {
        let ts = parse_timestamp("2025-03-01T10:20:30Z").unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_parse_naive_as_local() {
        assert!(parse_timestamp("2025-03-01T10:20:30").is_some());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }
}
