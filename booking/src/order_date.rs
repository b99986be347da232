//! Business order dates.
//!
//! Clients send the order date as text. It drives the cancellation window, so
//! parsing fails closed: a date that matches none of the accepted formats is
//! an error, never a default.

use crate::error::BookingError;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Naive formats tried after RFC 3339, read as UTC
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

/// Parse an order date.
///
/// Tried in order: RFC 3339 (`2025-01-01T10:00:00.000Z`), ISO without zone
/// (`2025-01-01T10:00:00`, fraction optional), and `2025-01-01 10:00:00`.
///
/// # Errors
///
/// Returns [`BookingError::Internal`] if no format matches.
pub fn parse_order_date(raw: &str) -> Result<DateTime<Utc>, BookingError> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| BookingError::Internal(format!("Unrecognised order date: {raw}")))
}

/// Server-assigned order date, RFC 3339 with milliseconds
#[must_use]
pub fn format_order_date(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_formats_agree() {
        let expected = parse_order_date("2025-01-01T10:00:00Z").unwrap();

        for raw in [
            "2025-01-01T10:00:00.000Z",
            "2025-01-01T11:00:00+01:00",
            "2025-01-01T10:00:00",
            "2025-01-01T10:00:00.000",
            "2025-01-01 10:00:00",
            "  2025-01-01 10:00:00 ",
        ] {
            assert_eq!(parse_order_date(raw).unwrap(), expected, "format: {raw}");
        }
    }

    #[test]
    fn test_unparseable_dates_fail_closed() {
        for raw in ["", "yesterday", "01/01/2025 10:00", "2025-13-01 10:00:00"] {
            assert!(matches!(parse_order_date(raw), Err(BookingError::Internal(_))), "{raw}");
        }
    }

    #[test]
    fn test_formatted_dates_parse_back() {
        let at = parse_order_date("2025-06-30T23:59:59.123Z").unwrap();
        assert_eq!(format_order_date(at), "2025-06-30T23:59:59.123Z");
        assert_eq!(parse_order_date(&format_order_date(at)).unwrap(), at);
    }
}
