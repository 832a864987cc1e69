//! Timestamp parser for the telemetry time column.
//!
//! Supports the textual forms telemetry writers commonly emit:
//! - RFC 3339 / ISO 8601 with offset: `2020-01-01T00:00:00Z`, `2020-01-01T01:00:00+01:00`
//! - ISO 8601 with a space separator and offset: `2020-01-01 00:00:00+0000`
//! - Trailing `UTC`/`GMT`: `2020-01-01 00:00:00 UTC`
//! - RFC 2822: `Wed, 01 Jan 2020 00:00:00 +0000`
//! - Naive date-time (taken as UTC): `2020-01-01 00:00:00.250`, `2020/01/01 00:00:00`,
//!   `01/31/2020 00:00:00`, `2020-01-01T00:00`
//! - Date only (midnight UTC): `2020-01-01`
//! - Unix timestamp: `1577836800`

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Error type for time parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeParseError {
    pub input: String,
    pub message: String,
}

impl std::fmt::Display for TimeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse time '{}': {}", self.input, self.message)
    }
}

impl std::error::Error for TimeParseError {}

/// Offset-aware formats, tried after RFC 3339.
const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
];

/// Formats without an offset, interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S%.f",
];

/// Parse a timestamp string into whole seconds since the Unix epoch.
///
/// # Examples
///
/// ```
/// use trident::util::parse_timestamp;
///
/// assert_eq!(parse_timestamp("2020-01-01T00:00:00Z").unwrap(), 1577836800);
/// assert_eq!(parse_timestamp("2020-01-01 01:00:00+0100").unwrap(), 1577836800);
/// ```
pub fn parse_timestamp(input: &str) -> Result<i64, TimeParseError> {
    let input = input.trim();

    if let Some(ts) = try_parse_unix_timestamp(input) {
        return Ok(ts);
    }

    if let Some(ts) = try_parse_zoned(input) {
        return Ok(ts);
    }

    if let Some(ts) = try_parse_naive(input) {
        return Ok(ts);
    }

    Err(TimeParseError {
        input: input.to_string(),
        message: "Unrecognized format. Use: ISO 8601 (2020-01-01T00:00:00Z), \
                  date time (2020-01-01 00:00:00 UTC), RFC 2822, \
                  or Unix timestamp (1577836800)"
            .to_string(),
    })
}

/// Try to parse as Unix timestamp (plain integer).
fn try_parse_unix_timestamp(input: &str) -> Option<i64> {
    if input.chars().all(|c| c.is_ascii_digit()) && !input.is_empty() {
        input.parse::<i64>().ok()
    } else {
        None
    }
}

/// Try the formats that carry their own offset.
fn try_parse_zoned(input: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.timestamp());
    }

    for fmt in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(input, fmt) {
            return Some(dt.timestamp());
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(dt.timestamp());
    }

    // Named UTC zone: "2020-01-01 00:00:00 UTC", "2020-01-01T00:00:00 GMT"
    let bare = input
        .strip_suffix("UTC")
        .or_else(|| input.strip_suffix("GMT"))?
        .trim_end();
    try_parse_naive(bare)
}

/// Try the formats without offset, assuming UTC.
fn try_parse_naive(input: &str) -> Option<i64> {
    for fmt in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(Utc.from_utc_datetime(&ndt).timestamp());
        }
    }

    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()?;
    let ndt = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&ndt).timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEW_YEAR_2020: i64 = 1577836800;

    #[test]
    fn test_unix_timestamp() {
        assert_eq!(parse_timestamp("1577836800").unwrap(), NEW_YEAR_2020);
        assert_eq!(parse_timestamp("0").unwrap(), 0);
    }

    #[test]
    fn test_rfc3339() {
        assert_eq!(parse_timestamp("2020-01-01T00:00:00Z").unwrap(), NEW_YEAR_2020);
        assert_eq!(
            parse_timestamp("2020-01-01T00:00:00.750Z").unwrap(),
            NEW_YEAR_2020
        );
        assert_eq!(
            parse_timestamp("2020-01-01T02:00:00+02:00").unwrap(),
            NEW_YEAR_2020
        );
    }

    #[test]
    fn test_space_separated_with_offset() {
        assert_eq!(
            parse_timestamp("2020-01-01 00:00:00+0000").unwrap(),
            NEW_YEAR_2020
        );
        assert_eq!(
            parse_timestamp("2019-12-31 19:00:00 -0500").unwrap(),
            NEW_YEAR_2020
        );
    }

    #[test]
    fn test_named_utc_zone() {
        assert_eq!(
            parse_timestamp("2020-01-01 00:00:00 UTC").unwrap(),
            NEW_YEAR_2020
        );
        assert_eq!(
            parse_timestamp("2020-01-01T00:00:00 GMT").unwrap(),
            NEW_YEAR_2020
        );
    }

    #[test]
    fn test_rfc2822() {
        assert_eq!(
            parse_timestamp("Wed, 01 Jan 2020 00:00:00 +0000").unwrap(),
            NEW_YEAR_2020
        );
    }

    #[test]
    fn test_naive_is_utc() {
        assert_eq!(
            parse_timestamp("2020-01-01 00:00:00").unwrap(),
            NEW_YEAR_2020
        );
        assert_eq!(
            parse_timestamp("2020-01-01T00:00:30.5").unwrap(),
            NEW_YEAR_2020 + 30
        );
        assert_eq!(
            parse_timestamp("2020/01/01 00:01:00").unwrap(),
            NEW_YEAR_2020 + 60
        );
        assert_eq!(
            parse_timestamp("01/01/2020 00:00:00").unwrap(),
            NEW_YEAR_2020
        );
        assert_eq!(parse_timestamp("2020-01-01T00:02").unwrap(), NEW_YEAR_2020 + 120);
        assert_eq!(parse_timestamp(" 2020-01-01 ").unwrap(), NEW_YEAR_2020);
    }

    #[test]
    fn test_invalid_formats() {
        assert!(parse_timestamp("").is_err());
        assert!(parse_timestamp("invalid").is_err());
        assert!(parse_timestamp("2020-13-01T00:00:00Z").is_err());
        assert!(parse_timestamp("UTC").is_err());
        assert!(parse_timestamp("-5").is_err());
    }

    #[test]
    fn test_error_display() {
        let err = parse_timestamp("soon").unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse time 'soon'"));
    }
}
