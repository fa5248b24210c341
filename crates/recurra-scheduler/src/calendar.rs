//! Small calendar helpers shared by the rule variants.

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc, Weekday};

/// Sentinel returned by `next_run` when a schedule has no further occurrence.
pub const NEVER: DateTime<Utc> = DateTime::<Utc>::MAX_UTC;

/// Weekdays in stored order: 0 = Sunday … 6 = Saturday.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

pub fn is_never(at: DateTime<Utc>) -> bool {
    at == NEVER
}

pub fn one_day() -> Duration {
    Duration::days(1)
}

/// Whether `span` is a time of day, `[00:00, 24:00)`.
pub fn is_time_of_day(span: Duration) -> bool {
    span >= Duration::zero() && span < one_day()
}

/// Stored index of `day` (0 = Sunday).
pub fn weekday_index(day: Weekday) -> usize {
    day.num_days_from_sunday() as usize
}

/// Weekday for any signed index, wrapping mod 7.
pub fn weekday_at(index: i64) -> Weekday {
    WEEKDAYS[index.rem_euclid(7) as usize]
}

/// Number of whole days in `span`, rounded toward negative infinity.
pub fn floor_days(span: Duration) -> i64 {
    let days = span.num_days();
    if span < Duration::days(days) {
        days - 1
    } else {
        days
    }
}

/// Time elapsed since midnight of `at`'s own date.
pub fn time_of_day(at: DateTime<Utc>) -> Duration {
    Duration::seconds(i64::from(at.num_seconds_from_midnight()))
        + Duration::nanoseconds(i64::from(at.nanosecond() % 1_000_000_000))
}

/// Midnight UTC of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((next - first).num_days() as u32)
}

/// `(year, month)` that lies `add` months after `(year, month)`.
pub fn add_months(year: i32, month: u32, add: u32) -> Option<(i32, u32)> {
    let zero_based = i64::from(month) - 1 + i64::from(add);
    let year = i64::from(year) + zero_based.div_euclid(12);
    let month = zero_based.rem_euclid(12) as u32 + 1;
    Some((i32::try_from(year).ok()?, month))
}
