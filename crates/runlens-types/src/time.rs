//! Timestamp helpers for the mixed formats found in checkpoint artifacts.
//!
//! Documents carry ISO-8601 strings with or without an offset (naive
//! values are local wall-clock time); the SQL store carries epoch seconds
//! as `REAL`.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an ISO-8601 timestamp as written by the pipeline.
///
/// Returns `None` for empty or unparseable input.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Convert fractional epoch seconds to a UTC timestamp.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn from_epoch_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

/// Fractional epoch seconds for `dt`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn to_epoch_secs(dt: DateTime<Utc>) -> f64 {
    dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) / 1e9
}

/// Render `dt` as an RFC 3339 string in the host's local offset.
#[must_use]
pub fn format_local(dt: DateTime<Utc>) -> String {
    dt.with_timezone(&Local)
        .to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_offset_and_zulu() {
        let a = parse_timestamp("2025-12-18T06:21:01Z").unwrap();
        let b = parse_timestamp("2025-12-18T08:21:01+02:00").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parses_naive_as_local_time() {
        let parsed = parse_timestamp("2025-12-18T06:21:01.123456").unwrap();
        let expected = Local
            .with_ymd_and_hms(2025, 12, 18, 6, 21, 1)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parsed.timestamp(), expected.timestamp());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn epoch_secs_round_trip_at_second_precision() {
        let dt = from_epoch_secs(1_700_000_000.5).unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
        assert!((to_epoch_secs(dt) - 1_700_000_000.5).abs() < 1e-6);
        assert!(from_epoch_secs(f64::NAN).is_none());
    }
}
