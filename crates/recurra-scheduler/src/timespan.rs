//! Text form of a signed time-of-day offset: `[-][d.]hh:mm:ss[.fffffff]`.
//!
//! This is the representation stored schedule payloads use for every
//! time-of-day field. Seven fractional digits are 100ns ticks. Usable as
//! `#[serde(with = "crate::timespan")]` on `chrono::Duration` fields.

use chrono::Duration;
use serde::{Deserialize, Deserializer, Serializer};

use crate::error::{Result, SchedulerError};

const TICK_NANOS: i64 = 100;

/// Parse `[-][d.]hh:mm[:ss[.fffffff]]`.
pub fn parse(input: &str) -> Result<Duration> {
    let invalid = || SchedulerError::InvalidTimeSpan(input.to_string());
    let trimmed = input.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let parts: Vec<&str> = body.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(invalid());
    }

    let (days, hours) = match parts[0].split_once('.') {
        Some((d, h)) => (parse_field(d, i64::MAX).ok_or_else(invalid)?, h),
        None => (0, parts[0]),
    };
    let hours = parse_field(hours, 23).ok_or_else(invalid)?;
    let minutes = parse_field(parts[1], 59).ok_or_else(invalid)?;

    let (seconds, nanos) = match parts.get(2) {
        None => (0, 0),
        Some(sec) => match sec.split_once('.') {
            Some((s, frac)) => (
                parse_field(s, 59).ok_or_else(invalid)?,
                parse_fraction(frac).ok_or_else(invalid)?,
            ),
            None => (parse_field(sec, 59).ok_or_else(invalid)?, 0),
        },
    };

    let total = Duration::try_days(days)
        .and_then(|d| d.checked_add(&Duration::hours(hours)))
        .and_then(|d| d.checked_add(&Duration::minutes(minutes)))
        .and_then(|d| d.checked_add(&Duration::seconds(seconds)))
        .and_then(|d| d.checked_add(&Duration::nanoseconds(nanos)))
        .ok_or_else(invalid)?;

    Ok(if negative { -total } else { total })
}

/// Render `span` in the same form [`parse`] accepts. The day prefix and the
/// fraction are omitted when zero.
pub fn format(span: &Duration) -> String {
    let negative = *span < Duration::zero();
    let abs = if negative { -*span } else { *span };

    let days = abs.num_days();
    let hours = abs.num_hours() % 24;
    let minutes = abs.num_minutes() % 60;
    let seconds = abs.num_seconds() % 60;
    let sub_nanos = (abs - Duration::seconds(abs.num_seconds()))
        .num_nanoseconds()
        .unwrap_or(0);

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if days > 0 {
        out.push_str(&format!("{days}."));
    }
    out.push_str(&format!("{hours:02}:{minutes:02}:{seconds:02}"));
    let ticks = sub_nanos / TICK_NANOS;
    if ticks > 0 {
        out.push_str(&format!(".{ticks:07}"));
    }
    out
}

fn parse_field(s: &str, max: i64) -> Option<i64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<i64>().ok().filter(|v| *v <= max)
}

fn parse_fraction(frac: &str) -> Option<i64> {
    if frac.is_empty() || frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // right-pad to nanosecond precision
    let padded = format!("{frac:0<9}");
    padded.parse().ok()
}

pub fn serialize<S>(span: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(span))
}

pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_clock_time() {
        assert_eq!(
            parse("18:30:00").unwrap(),
            Duration::hours(18) + Duration::minutes(30)
        );
        assert_eq!(parse("06:05").unwrap(), Duration::hours(6) + Duration::minutes(5));
    }

    #[test]
    fn parses_ticks_and_days() {
        let span = parse("1.02:00:00.5000000").unwrap();
        assert_eq!(span, Duration::hours(26) + Duration::milliseconds(500));
        assert_eq!(parse("00:00:00.0000001").unwrap(), Duration::nanoseconds(100));
    }

    #[test]
    fn parses_negative_spans() {
        assert_eq!(parse("-02:00:00").unwrap(), Duration::hours(-2));
        assert_eq!(parse("-1.01:00:00").unwrap(), Duration::hours(-25));
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["", "18", "24:00:00", "10:60:00", "10:00:60", "a:b:c", "1:2:3:4", "10:00:00."] {
            assert!(parse(bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn formats_like_stored_payloads() {
        assert_eq!(format(&Duration::hours(18)), "18:00:00");
        assert_eq!(format(&Duration::hours(-2)), "-02:00:00");
        assert_eq!(format(&Duration::hours(26)), "1.02:00:00");
        assert_eq!(
            format(&(Duration::seconds(5) + Duration::milliseconds(250))),
            "00:00:05.2500000"
        );
    }
}
