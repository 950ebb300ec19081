//! Date and count parsing for raw cell values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::value::RawValue;

/// Spreadsheet serial of 1970-01-01 (serial day 0 is 1899-12-30).
pub const UNIX_EPOCH_SERIAL: f64 = 25_569.0;

const MS_PER_DAY: f64 = 86_400_000.0;

/// Largest integer an `f64` represents exactly.
const MAX_EXACT_COUNT: f64 = 9_007_199_254_740_991.0;

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

/// Converts a spreadsheet serial day count to UTC.
///
/// Uses whole-millisecond UTC arithmetic so serial `n` maps to exactly
/// `1970-01-01 + (n - 25569)` days; fractional serials carry time of day.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn from_spreadsheet_serial(serial: f64) -> Option<DateTime<Utc>> {
    if !serial.is_finite() {
        return None;
    }
    let ms = ((serial - UNIX_EPOCH_SERIAL) * MS_PER_DAY).round();
    if ms.abs() > MAX_EXACT_COUNT {
        return None;
    }
    DateTime::from_timestamp_millis(ms as i64)
}

/// Parses a textual date in any accepted layout. Times without an offset
/// and bare dates are taken as UTC.
#[must_use]
pub fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date.and_time(chrono::NaiveTime::MIN).and_utc());
        }
    }
    None
}

/// Interprets any raw value as a point in time.
#[must_use]
pub fn parse_date(value: &RawValue) -> Option<DateTime<Utc>> {
    match value {
        RawValue::Date(date) => Some(*date),
        RawValue::Number(serial) => from_spreadsheet_serial(*serial),
        RawValue::Text(s) => parse_date_str(s),
        RawValue::Empty | RawValue::Bool(_) => None,
    }
}

/// Interprets a raw value as a non-negative whole count.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_count(value: &RawValue) -> Option<u64> {
    let n = match value {
        RawValue::Number(n) => *n,
        RawValue::Text(s) => s.trim().parse::<f64>().ok()?,
        RawValue::Empty | RawValue::Bool(_) | RawValue::Date(_) => return None,
    };
    if !n.is_finite() || n < 0.0 || n.fract() != 0.0 || n > MAX_EXACT_COUNT {
        return None;
    }
    Some(n as u64)
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn epoch() -> DateTime<Utc> {
        DateTime::from_timestamp(0, 0).unwrap()
    }

    #[test]
    fn serial_25569_is_unix_epoch() {
        assert_eq!(from_spreadsheet_serial(25_569.0), Some(epoch()));
    }

    #[test]
    fn whole_serials_are_exact_day_offsets() {
        for n in (1..=80_000).step_by(997) {
            let expected = epoch() + TimeDelta::days(i64::from(n) - 25_569);
            assert_eq!(from_spreadsheet_serial(f64::from(n)), Some(expected), "serial {n}");
        }
    }

    #[test]
    fn serial_45061_is_2023_05_15() {
        let date = from_spreadsheet_serial(45_061.0).unwrap();
        assert_eq!(date.to_rfc3339(), "2023-05-15T00:00:00+00:00");
    }

    #[test]
    fn fractional_serial_carries_time_of_day() {
        let date = from_spreadsheet_serial(45_061.5).unwrap();
        assert_eq!(date.to_rfc3339(), "2023-05-15T12:00:00+00:00");
    }

    #[test]
    fn parses_supported_layouts() {
        let expected = "2023-05-15T00:00:00+00:00";
        for s in [
            "2023-05-15",
            "2023/05/15",
            "05/15/2023",
            "15-05-2023",
            "15 May 2023",
            "May 15, 2023",
            "2023-05-15T00:00:00Z",
            "2023-05-15T00:00:00.000",
        ] {
            assert_eq!(
                parse_date_str(s).map(|d| d.to_rfc3339()).as_deref(),
                Some(expected),
                "{s}"
            );
        }
    }

    #[test]
    fn day_first_slash_is_a_fallback() {
        let date = parse_date_str("25/12/2023").unwrap();
        assert_eq!(date.to_rfc3339(), "2023-12-25T00:00:00+00:00");
    }

    #[test]
    fn offset_timestamps_convert_to_utc() {
        let date = parse_date_str("2023-05-15T05:30:00+05:30").unwrap();
        assert_eq!(date.to_rfc3339(), "2023-05-15T00:00:00+00:00");
    }

    #[test]
    fn rejects_garbage_dates() {
        assert!(parse_date_str("not-a-date").is_none());
        assert!(parse_date_str("2023-13-45").is_none());
        assert!(parse_date(&RawValue::Bool(true)).is_none());
        assert!(parse_date(&RawValue::Number(f64::NAN)).is_none());
    }

    #[test]
    fn counts_must_be_whole_and_non_negative() {
        assert_eq!(parse_count(&RawValue::Number(120.0)), Some(120));
        assert_eq!(parse_count(&RawValue::from(" 80 ")), Some(80));
        assert_eq!(parse_count(&RawValue::from("0")), Some(0));
        assert_eq!(parse_count(&RawValue::Number(-1.0)), None);
        assert_eq!(parse_count(&RawValue::Number(2.5)), None);
        assert_eq!(parse_count(&RawValue::from("twelve")), None);
        assert_eq!(parse_count(&RawValue::Empty), None);
    }
}
