//! Time expression resolution.
//!
//! Query time bounds accept three shapes:
//! - relative durations: `90s`, `15m`, `2h`, `7d`, `1w` (the reference
//!   instant minus the duration)
//! - ISO-8601 timestamps: `2024-01-15T10:30:00Z`, `2024-01-15 10:30:00`
//!   (no offset means UTC)
//! - bare dates: `2024-01-15` (midnight UTC)
//!
//! Resolution never reads the system clock; callers pass the reference
//! instant explicitly so results are reproducible.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

/// Errors that can occur while resolving a time expression.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeError {
    /// The expression matches none of the accepted shapes.
    #[error("Invalid time expression: '{0}'")]
    InvalidExpression(String),

    /// A relative duration used a unit other than `s`, `m`, `h`, `d` or `w`.
    #[error("Unknown time unit: '{0}'")]
    UnknownUnit(char),
}

/// Accepted timestamp layouts without an explicit offset, tried in order.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Resolves a time expression against the given reference instant.
///
/// # Errors
///
/// Returns a [`TimeError`] if the expression is not a relative duration,
/// an ISO-8601 timestamp, or a bare date.
///
/// # Example
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use shared::time::resolve;
///
/// let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
/// assert_eq!(resolve("2h", now).unwrap(), now - Duration::hours(2));
/// ```
pub fn resolve(expression: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, TimeError> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Err(TimeError::InvalidExpression(String::new()));
    }

    if let Some(resolved) = resolve_relative(expression, now)? {
        return Ok(resolved);
    }

    parse_timestamp(expression)
        .ok_or_else(|| TimeError::InvalidExpression(expression.to_string()))
}

/// Parses an absolute timestamp string to UTC.
///
/// Accepts RFC 3339 timestamps, the naive layouts listed in the module
/// docs (assumed UTC), and bare `YYYY-MM-DD` dates (midnight UTC).
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    for layout in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, layout) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    None
}

/// Formats a timestamp for interpolation into `toDateTime64(..., 3)`.
///
/// Always UTC with millisecond precision, e.g. `2024-01-15 10:30:00.250`.
#[must_use]
pub fn clickhouse_datetime(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// Attempts to read the expression as `<digits><unit>`. Returns `Ok(None)`
/// when the shape does not apply, leaving absolute parsing to the caller.
fn resolve_relative(
    expression: &str,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, TimeError> {
    let Some(unit) = expression.chars().last() else {
        return Ok(None);
    };
    if unit.is_ascii_digit() {
        return Ok(None);
    }

    let magnitude = &expression[..expression.len() - unit.len_utf8()];
    if magnitude.is_empty() || !magnitude.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(None);
    }

    let count: i64 = magnitude
        .parse()
        .map_err(|_| TimeError::InvalidExpression(expression.to_string()))?;

    let delta = match unit {
        's' => Duration::try_seconds(count),
        'm' => Duration::try_minutes(count),
        'h' => Duration::try_hours(count),
        'd' => Duration::try_days(count),
        'w' => Duration::try_weeks(count),
        other => return Err(TimeError::UnknownUnit(other)),
    };

    delta
        .and_then(|delta| now.checked_sub_signed(delta))
        .ok_or_else(|| TimeError::InvalidExpression(expression.to_string()))
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_resolve_relative_hours() {
        let now = reference();
        assert_eq!(resolve("2h", now).unwrap(), now - Duration::hours(2));
    }

    #[test]
    fn test_resolve_zero_duration_is_now() {
        let now = reference();
        assert_eq!(resolve("0h", now).unwrap(), now);
    }

    #[test]
    fn test_resolve_all_units() {
        let now = reference();
        assert_eq!(resolve("90s", now).unwrap(), now - Duration::seconds(90));
        assert_eq!(resolve("15m", now).unwrap(), now - Duration::minutes(15));
        assert_eq!(resolve("3d", now).unwrap(), now - Duration::days(3));
        assert_eq!(resolve("2w", now).unwrap(), now - Duration::weeks(2));
    }

    #[test]
    fn test_resolve_unknown_unit() {
        assert_eq!(resolve("5x", reference()), Err(TimeError::UnknownUnit('x')));
    }

    #[test]
    fn test_resolve_bare_number_is_invalid() {
        assert!(matches!(
            resolve("42", reference()),
            Err(TimeError::InvalidExpression(_))
        ));
    }

    #[test]
    fn test_resolve_unit_without_magnitude_is_invalid() {
        assert!(matches!(
            resolve("h", reference()),
            Err(TimeError::InvalidExpression(_))
        ));
    }

    #[test]
    fn test_resolve_iso_with_offset() {
        let resolved = resolve("2024-01-15T10:30:00+02:00", reference()).unwrap();
        assert_eq!(resolved, Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap());
    }

    #[test]
    fn test_resolve_naive_timestamp_assumes_utc() {
        let resolved = resolve("2024-01-15T10:30:00", reference()).unwrap();
        assert_eq!(resolved, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_resolve_space_separated_timestamp() {
        let resolved = resolve("2024-01-15 10:30:00", reference()).unwrap();
        assert_eq!(resolved, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_resolve_fractional_seconds() {
        let resolved = resolve("2024-01-15T10:30:00.250", reference()).unwrap();
        let expected =
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap() + Duration::milliseconds(250);
        assert_eq!(resolved, expected);
    }

    #[test]
    fn test_resolve_bare_date_is_midnight_utc() {
        let resolved = resolve("2024-01-15", reference()).unwrap();
        assert_eq!(resolved, Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_resolve_garbage_fails() {
        assert!(resolve("tomorrow", reference()).is_err());
        assert!(resolve("", reference()).is_err());
        assert!(resolve("  ", reference()).is_err());
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let now = reference();
        assert_eq!(resolve("30m", now).unwrap(), resolve("30m", now).unwrap());
    }

    #[test]
    fn test_parse_timestamp_rejects_relative() {
        assert!(parse_timestamp("2h").is_none());
    }

    #[test]
    fn test_clickhouse_datetime_always_has_milliseconds() {
        let whole = reference();
        assert_eq!(clickhouse_datetime(whole), "2024-01-15 12:00:00.000");
        let fractional = reference() + Duration::milliseconds(250);
        assert_eq!(clickhouse_datetime(fractional), "2024-01-15 12:00:00.250");
    }

    #[test]
    fn test_clickhouse_datetime_round_trips_through_parse() {
        let original = reference() + Duration::milliseconds(123);
        let parsed = parse_timestamp(&clickhouse_datetime(original)).unwrap();
        assert_eq!(parsed, original);
    }
}
