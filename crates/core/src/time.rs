use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{Result, ViewError};

/// Lenient RFC3339 parse used for query parameters: malformed input leaves the filter unset.
pub fn parse_optional_rfc3339(name: &str, input: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = input.map(str::trim).filter(|s| !s.is_empty())?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!(param = name, value = raw, error = %e, "ignoring malformed time filter");
            None
        }
    }
}

pub fn parse_duration_str(input: &str) -> Result<Duration> {
    humantime::parse_duration(input)
        .map_err(|e| ViewError::Parse(format!("invalid duration {input}: {e}")))
}

pub fn nanos_to_dt(nanos: u64) -> DateTime<Utc> {
    let secs = (nanos / 1_000_000_000) as i64;
    let sub = (nanos % 1_000_000_000) as u32;
    Utc.timestamp_opt(secs, sub)
        .single()
        .unwrap_or_else(|| Utc.timestamp_nanos(0))
}

pub fn epoch_secs_to_dt(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or_else(|| Utc.timestamp_nanos(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_filter() {
        let ts = parse_optional_rfc3339("start_time", Some("2026-01-01T00:00:00Z")).unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-01-01T00:00:00+00:00");
    }

    #[test]
    fn malformed_filter_is_ignored() {
        assert!(parse_optional_rfc3339("start_time", Some("yesterday")).is_none());
        assert!(parse_optional_rfc3339("start_time", Some("")).is_none());
        assert!(parse_optional_rfc3339("start_time", None).is_none());
    }

    #[test]
    fn converts_nanos() {
        let ts = nanos_to_dt(1_700_000_000_123_000_000);
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_millis(), 123);
    }

    #[test]
    fn parses_duration() {
        assert_eq!(parse_duration_str("10s").unwrap(), Duration::from_secs(10));
        assert!(parse_duration_str("soon").is_err());
    }
}
