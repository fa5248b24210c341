use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};

/// A span of time of day, `begin..=end`, measured from midnight.
///
/// Both ends are signed and may leave `[0h, 24h]` while an offset is being
/// applied; [`crate::WeeklyIntervalSet`] splits them back into range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct TimeInterval {
    #[serde(rename = "Begin", serialize_with = "crate::timespan::serialize")]
    begin: Duration,
    #[serde(rename = "End", serialize_with = "crate::timespan::serialize")]
    end: Duration,
}

#[derive(Deserialize)]
struct RawInterval {
    #[serde(rename = "Begin", with = "crate::timespan")]
    begin: Duration,
    #[serde(rename = "End", with = "crate::timespan")]
    end: Duration,
}

impl TryFrom<RawInterval> for TimeInterval {
    type Error = SchedulerError;

    fn try_from(raw: RawInterval) -> Result<Self> {
        TimeInterval::new(raw.begin, raw.end)
    }
}

impl TimeInterval {
    pub fn new(begin: Duration, end: Duration) -> Result<Self> {
        if end < begin {
            return Err(SchedulerError::InvalidInterval { begin, end });
        }
        Ok(Self { begin, end })
    }

    /// Whole-hour convenience constructor.
    pub fn hours(begin: i64, end: i64) -> Result<Self> {
        Self::new(Duration::hours(begin), Duration::hours(end))
    }

    pub fn begin(&self) -> Duration {
        self.begin
    }

    pub fn end(&self) -> Duration {
        self.end
    }

    /// Whether `t` lies within the interval. With `exclusive` both boundary
    /// points are outside.
    pub fn contains(&self, t: Duration, exclusive: bool) -> bool {
        if exclusive {
            self.begin < t && t < self.end
        } else {
            self.begin <= t && t <= self.end
        }
    }

    pub(crate) fn shifted(&self, by: Duration) -> Self {
        Self {
            begin: self.begin + by,
            end: self.end + by,
        }
    }

    /// Invariant-preserving constructor for values already known to be ordered.
    pub(crate) fn from_ordered(begin: Duration, end: Duration) -> Self {
        debug_assert!(begin <= end);
        Self { begin, end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_reversed_bounds() {
        let err = TimeInterval::hours(22, 2).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidInterval { .. }));
    }

    #[test]
    fn zero_length_interval_is_valid() {
        let iv = TimeInterval::hours(5, 5).unwrap();
        assert!(iv.contains(Duration::hours(5), false));
        assert!(!iv.contains(Duration::hours(5), true));
    }

    #[test]
    fn inclusive_and_exclusive_boundaries() {
        let iv = TimeInterval::hours(9, 17).unwrap();
        assert!(iv.contains(Duration::hours(9), false));
        assert!(iv.contains(Duration::hours(17), false));
        assert!(!iv.contains(Duration::hours(9), true));
        assert!(!iv.contains(Duration::hours(17), true));
        assert!(iv.contains(Duration::hours(12), true));
        assert!(!iv.contains(Duration::hours(18), false));
    }

    #[test]
    fn decodes_and_validates_json() {
        let iv: TimeInterval =
            serde_json::from_str(r#"{"Begin":"08:00:00","End":"12:30:00"}"#).unwrap();
        assert_eq!(iv.end(), Duration::hours(12) + Duration::minutes(30));

        let bad = serde_json::from_str::<TimeInterval>(r#"{"Begin":"12:00:00","End":"08:00:00"}"#);
        assert!(bad.is_err());
    }
}
