//! Tolerant date/time parsing for loosely structured upstream payloads.
//!
//! Every parser here lands on a *naive* UTC instant: offset-aware inputs are
//! converted to UTC and the offset dropped, offset-less inputs are taken as
//! already UTC. Accepted shapes:
//! - ISO-8601 with or without offset ("2024-03-10T09:30:00+07:00", "...Z",
//!   "2024-03-10T09:30:00")
//! - "YYYY-MM-DD HH:MM:SS"
//! - "YYYY-MM-DD" (midnight UTC)
//! - "MM/DD/YYYY" (midnight UTC)
//! - numeric epoch seconds or milliseconds (> 1e12 is treated as ms)

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Parse an ISO-8601 string into a naive UTC instant.
///
/// Offset-aware inputs (including `Z`) are converted to UTC first.
pub fn parse_iso_naive(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    None
}

/// Parse any supported date/time value into a naive UTC instant.
///
/// Returns `None` for missing, unparseable, or non-scalar values; callers
/// decide the fallback (normalization falls back to "now").
pub fn parse_datetime_value(val: &Value) -> Option<NaiveDateTime> {
    match val {
        Value::String(s) => parse_datetime_str(s),
        Value::Number(n) => parse_epoch(n.as_f64()?),
        _ => None,
    }
}

fn parse_datetime_str(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.contains('T') || s.ends_with('Z') {
        return parse_iso_naive(s);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn parse_epoch(v: f64) -> Option<NaiveDateTime> {
    if !v.is_finite() {
        return None;
    }
    let dt = if v > 1_000_000_000_000.0 {
        DateTime::<Utc>::from_timestamp_millis(v as i64)?
    } else {
        DateTime::<Utc>::from_timestamp(v as i64, 0)?
    };
    Some(dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ymd_hms(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn iso_with_offset_converts_to_utc() {
        let got = parse_iso_naive("2024-03-10T09:30:00+07:00").unwrap();
        assert_eq!(got, ymd_hms(2024, 3, 10, 2, 30, 0));
    }

    #[test]
    fn iso_zulu_and_naive() {
        assert_eq!(
            parse_iso_naive("2024-03-10T09:30:00Z").unwrap(),
            ymd_hms(2024, 3, 10, 9, 30, 0)
        );
        assert_eq!(
            parse_iso_naive("2024-03-10T09:30:00").unwrap(),
            ymd_hms(2024, 3, 10, 9, 30, 0)
        );
    }

    #[test]
    fn space_separated_and_date_only() {
        assert_eq!(
            parse_datetime_value(&json!("2024-03-10 09:30:00")).unwrap(),
            ymd_hms(2024, 3, 10, 9, 30, 0)
        );
        assert_eq!(
            parse_datetime_value(&json!("2024-03-10")).unwrap(),
            ymd_hms(2024, 3, 10, 0, 0, 0)
        );
        assert_eq!(
            parse_datetime_value(&json!("3/9/2024")).unwrap(),
            ymd_hms(2024, 3, 9, 0, 0, 0)
        );
    }

    #[test]
    fn epoch_seconds_and_millis() {
        assert_eq!(
            parse_datetime_value(&json!(1710063000)).unwrap(),
            ymd_hms(2024, 3, 10, 9, 30, 0)
        );
        assert_eq!(
            parse_datetime_value(&json!(1710063000000i64)).unwrap(),
            ymd_hms(2024, 3, 10, 9, 30, 0)
        );
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_datetime_value(&json!("not a date")), None);
        assert_eq!(parse_datetime_value(&json!(null)), None);
        assert_eq!(parse_datetime_value(&json!(["2024-03-10"])), None);
        assert_eq!(parse_datetime_value(&json!("")), None);
    }
}
