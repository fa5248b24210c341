use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, Utc, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::calendar::{days_in_month, is_time_of_day, one_day, weekday_index, WEEKDAYS};
use crate::error::{Result, SchedulerError};
use crate::weekly::WeeklyIntervalSet;

/// Decoded parameters of a stored schedule, one variant per scheduling mode.
///
/// Values are never mutated in place: offset conversions return a new rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceRule {
    /// Fires exactly once.
    Delayed(DelayedRule),
    /// Fires on selected weekdays at a time of day.
    Daily(DailyRule),
    /// Fires every N hours or minutes, optionally inside a weekly window.
    Periodic(PeriodicRule),
    /// Fires on one day of selected months at a time of day.
    Monthly(MonthlyRule),
}

/// Unit of a [`PeriodicRule`] period. Stored as `0` (hours) or `1` (minutes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PeriodUnit {
    Hour,
    Minute,
}

impl PeriodUnit {
    /// `value` units as a span, `None` if it does not fit.
    pub fn span(self, value: u32) -> Option<Duration> {
        match self {
            PeriodUnit::Hour => Duration::try_hours(i64::from(value)),
            PeriodUnit::Minute => Duration::try_minutes(i64::from(value)),
        }
    }
}

impl TryFrom<u8> for PeriodUnit {
    type Error = SchedulerError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(PeriodUnit::Hour),
            1 => Ok(PeriodUnit::Minute),
            other => Err(SchedulerError::InvalidRecurrenceValue(format!(
                "unsupported interval unit {other}"
            ))),
        }
    }
}

impl From<PeriodUnit> for u8 {
    fn from(unit: PeriodUnit) -> Self {
        match unit {
            PeriodUnit::Hour => 0,
            PeriodUnit::Minute => 1,
        }
    }
}

/// Day selector of a [`MonthlyRule`]. Stored as `1..=31`, or `-1` for the
/// last day of the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum DayOfMonth {
    Day(u32),
    Last,
}

impl DayOfMonth {
    pub const LAST_CODE: i32 = -1;

    /// Concrete day in `year`/`month`, `None` when the month is too short.
    pub fn resolve(self, year: i32, month: u32) -> Option<u32> {
        let len = days_in_month(year, month)?;
        match self {
            DayOfMonth::Last => Some(len),
            DayOfMonth::Day(day) if day <= len => Some(day),
            DayOfMonth::Day(_) => None,
        }
    }
}

impl TryFrom<i32> for DayOfMonth {
    type Error = SchedulerError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            DayOfMonth::LAST_CODE => Ok(DayOfMonth::Last),
            1..=31 => Ok(DayOfMonth::Day(code as u32)),
            other => Err(SchedulerError::InvalidRecurrenceValue(format!(
                "day of month {other} is outside 1..=31"
            ))),
        }
    }
}

impl From<DayOfMonth> for i32 {
    fn from(day: DayOfMonth) -> Self {
        match day {
            DayOfMonth::Day(d) => d as i32,
            DayOfMonth::Last => DayOfMonth::LAST_CODE,
        }
    }
}

// --- Delayed -----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDelayed")]
pub struct DelayedRule {
    #[serde(rename = "RunAtDateTime", serialize_with = "serialize_instant")]
    pub(crate) run_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawDelayed {
    #[serde(rename = "RunAtDateTime", deserialize_with = "deserialize_instant")]
    run_at: DateTime<Utc>,
}

impl TryFrom<RawDelayed> for DelayedRule {
    type Error = SchedulerError;

    fn try_from(raw: RawDelayed) -> Result<Self> {
        Ok(DelayedRule::new(raw.run_at))
    }
}

impl DelayedRule {
    pub fn new(run_at: DateTime<Utc>) -> Self {
        Self { run_at }
    }

    pub fn run_at(&self) -> DateTime<Utc> {
        self.run_at
    }
}

fn serialize_instant<S>(at: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// RFC 3339, or an offset-less ISO-8601 timestamp read as UTC.
fn deserialize_instant<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(at) = DateTime::parse_from_rfc3339(raw.trim()) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid RunAtDateTime {raw:?}: {e}")))
}

// --- Daily -------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDaily")]
pub struct DailyRule {
    /// Stored weekday indexes, 0 = Sunday.
    #[serde(rename = "Days")]
    pub(crate) days: BTreeSet<u8>,
    #[serde(rename = "Time", serialize_with = "crate::timespan::serialize")]
    pub(crate) time: Duration,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawDaily {
    #[serde(rename = "Days", default)]
    days: Vec<u8>,
    #[serde(rename = "Time", with = "crate::timespan")]
    time: Duration,
}

impl TryFrom<RawDaily> for DailyRule {
    type Error = SchedulerError;

    fn try_from(raw: RawDaily) -> Result<Self> {
        if let Some(bad) = raw.days.iter().find(|d| **d > 6) {
            return Err(SchedulerError::InvalidRecurrenceValue(format!(
                "weekday {bad} is outside 0..=6"
            )));
        }
        if !is_time_of_day(raw.time) {
            return Err(SchedulerError::InvalidRecurrenceValue(format!(
                "daily time {} is outside 00:00..24:00",
                crate::timespan::format(&raw.time)
            )));
        }
        Ok(Self {
            days: raw.days.into_iter().collect(),
            time: raw.time,
        })
    }
}

impl DailyRule {
    pub fn new(days: impl IntoIterator<Item = Weekday>, time: Duration) -> Self {
        Self {
            days: days.into_iter().map(|d| weekday_index(d) as u8).collect(),
            time,
        }
    }

    /// Selected weekdays, Sunday first.
    pub fn days(&self) -> Vec<Weekday> {
        self.days.iter().map(|d| WEEKDAYS[usize::from(*d)]).collect()
    }

    pub fn time(&self) -> Duration {
        self.time
    }

    pub(crate) fn runs_on(&self, day: Weekday) -> bool {
        self.days.contains(&(weekday_index(day) as u8))
    }
}

// --- Periodic ----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPeriodic")]
pub struct PeriodicRule {
    #[serde(rename = "TimeIntervalType")]
    pub(crate) unit: PeriodUnit,
    #[serde(rename = "TimeIntervalValue")]
    pub(crate) value: u32,
    #[serde(rename = "DailyIntervals")]
    pub(crate) window: WeeklyIntervalSet,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPeriodic {
    #[serde(rename = "TimeIntervalType")]
    unit: u8,
    #[serde(rename = "TimeIntervalValue")]
    value: u32,
    #[serde(rename = "DailyIntervals", default)]
    window: Option<WeeklyIntervalSet>,
}

impl TryFrom<RawPeriodic> for PeriodicRule {
    type Error = SchedulerError;

    fn try_from(raw: RawPeriodic) -> Result<Self> {
        PeriodicRule::new(
            PeriodUnit::try_from(raw.unit)?,
            raw.value,
            raw.window.unwrap_or_default(),
        )
    }
}

impl PeriodicRule {
    /// `window` is stored normalized: intervals crossing midnight are split
    /// onto the neighbouring weekday and touching ones merged.
    pub fn new(unit: PeriodUnit, value: u32, window: WeeklyIntervalSet) -> Result<Self> {
        if value == 0 {
            return Err(SchedulerError::InvalidRecurrenceValue(
                "interval value must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            unit,
            value,
            window: window.normalized(),
        })
    }

    pub fn unit(&self) -> PeriodUnit {
        self.unit
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn window(&self) -> &WeeklyIntervalSet {
        &self.window
    }
}

// --- Monthly -----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMonthly")]
pub struct MonthlyRule {
    #[serde(rename = "DayOfMonth")]
    pub(crate) day_of_month: DayOfMonth,
    #[serde(rename = "TimeOfDay", serialize_with = "crate::timespan::serialize")]
    pub(crate) time: Duration,
    #[serde(rename = "MonthList")]
    pub(crate) months: BTreeSet<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawMonthly {
    #[serde(rename = "DayOfMonth")]
    day_of_month: i32,
    #[serde(rename = "TimeOfDay", with = "crate::timespan")]
    time: Duration,
    #[serde(rename = "MonthList", default)]
    months: Vec<u32>,
}

impl TryFrom<RawMonthly> for MonthlyRule {
    type Error = SchedulerError;

    fn try_from(raw: RawMonthly) -> Result<Self> {
        MonthlyRule::new(DayOfMonth::try_from(raw.day_of_month)?, raw.time, raw.months)
    }
}

impl MonthlyRule {
    pub fn new(
        day_of_month: DayOfMonth,
        time: Duration,
        months: impl IntoIterator<Item = u32>,
    ) -> Result<Self> {
        if let DayOfMonth::Day(day) = day_of_month {
            DayOfMonth::try_from(day as i32)?;
        }
        // the last day moved back across midnight keeps a negative time
        let time_ok = match day_of_month {
            DayOfMonth::Last => is_time_of_day(time) || is_time_of_day(time + one_day()),
            DayOfMonth::Day(_) => is_time_of_day(time),
        };
        if !time_ok {
            return Err(SchedulerError::InvalidRecurrenceValue(format!(
                "monthly time {} is outside 00:00..24:00",
                crate::timespan::format(&time)
            )));
        }
        let months: BTreeSet<u32> = months.into_iter().collect();
        if let Some(bad) = months.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(SchedulerError::InvalidRecurrenceValue(format!(
                "month {bad} is outside 1..=12"
            )));
        }
        Ok(Self {
            day_of_month,
            time,
            months,
        })
    }

    pub fn day_of_month(&self) -> DayOfMonth {
        self.day_of_month
    }

    pub fn time(&self) -> Duration {
        self.time
    }

    /// Selected months, `1..=12`, ascending.
    pub fn months(&self) -> Vec<u32> {
        self.months.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_unit_codes() {
        assert_eq!(PeriodUnit::try_from(0).unwrap(), PeriodUnit::Hour);
        assert_eq!(PeriodUnit::try_from(1).unwrap(), PeriodUnit::Minute);
        assert!(PeriodUnit::try_from(2).is_err());
        assert_eq!(PeriodUnit::Minute.span(90), Some(Duration::minutes(90)));
    }

    #[test]
    fn day_of_month_bounds() {
        assert_eq!(DayOfMonth::try_from(-1).unwrap(), DayOfMonth::Last);
        assert_eq!(DayOfMonth::try_from(31).unwrap(), DayOfMonth::Day(31));
        assert!(DayOfMonth::try_from(0).is_err());
        assert!(DayOfMonth::try_from(32).is_err());
        assert!(DayOfMonth::try_from(-2).is_err());
    }

    #[test]
    fn day_of_month_resolves_against_month_length() {
        assert_eq!(DayOfMonth::Last.resolve(2023, 2), Some(28));
        assert_eq!(DayOfMonth::Last.resolve(2024, 2), Some(29));
        assert_eq!(DayOfMonth::Day(31).resolve(2024, 4), None);
        assert_eq!(DayOfMonth::Day(30).resolve(2024, 4), Some(30));
    }

    #[test]
    fn periodic_rejects_zero_value() {
        let err = PeriodicRule::new(PeriodUnit::Hour, 0, WeeklyIntervalSet::new()).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidRecurrenceValue(_)));
    }

    #[test]
    fn monthly_rejects_bad_months_and_days() {
        assert!(MonthlyRule::new(DayOfMonth::Day(5), Duration::zero(), [0]).is_err());
        assert!(MonthlyRule::new(DayOfMonth::Day(5), Duration::zero(), [13]).is_err());
        assert!(MonthlyRule::new(DayOfMonth::Day(40), Duration::zero(), [1]).is_err());
        assert!(MonthlyRule::new(DayOfMonth::Last, Duration::zero(), [2, 12]).is_ok());
    }

    #[test]
    fn times_outside_the_day_are_rejected() {
        let late = serde_json::from_str::<DailyRule>(r#"{"Days":[1],"Time":"1.02:00:00"}"#)
            .unwrap_err()
            .to_string();
        assert!(late.contains("outside 00:00..24:00"), "{late}");
        assert!(serde_json::from_str::<DailyRule>(r#"{"Days":[1],"Time":"-01:00:00"}"#).is_err());

        let hours = Duration::hours;
        assert!(MonthlyRule::new(DayOfMonth::Day(5), hours(26), [1]).is_err());
        assert!(MonthlyRule::new(DayOfMonth::Day(5), hours(-2), [1]).is_err());
        assert!(MonthlyRule::new(DayOfMonth::Last, hours(-2), [1]).is_ok());
        assert!(MonthlyRule::new(DayOfMonth::Last, hours(-25), [1]).is_err());
    }

    #[test]
    fn periodic_window_is_normalized_on_construction() {
        use crate::interval::TimeInterval;

        let window = WeeklyIntervalSet::new()
            .with_interval(Weekday::Mon, TimeInterval::hours(22, 26).unwrap())
            .with_interval(Weekday::Mon, TimeInterval::hours(9, 12).unwrap())
            .with_interval(Weekday::Mon, TimeInterval::hours(11, 13).unwrap());
        let rule = PeriodicRule::new(PeriodUnit::Hour, 1, window).unwrap();
        assert_eq!(
            rule.window().intervals(Weekday::Mon),
            &[TimeInterval::hours(9, 13).unwrap(), TimeInterval::hours(22, 24).unwrap()]
        );
        assert_eq!(rule.window().intervals(Weekday::Tue), &[TimeInterval::hours(0, 2).unwrap()]);
    }

    #[test]
    fn daily_rejects_bad_weekday_index() {
        let bad = serde_json::from_str::<DailyRule>(r#"{"Days":[7],"Time":"10:00:00"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn delayed_accepts_offsetless_timestamps() {
        let rule: DelayedRule =
            serde_json::from_str(r#"{"RunAtDateTime":"2024-03-01T08:30:00"}"#).unwrap();
        assert_eq!(rule.run_at().to_rfc3339(), "2024-03-01T08:30:00+00:00");

        let rule: DelayedRule =
            serde_json::from_str(r#"{"RunAtDateTime":"2024-03-01T08:30:00+02:00"}"#).unwrap();
        assert_eq!(rule.run_at().to_rfc3339(), "2024-03-01T06:30:00+00:00");
    }
}
