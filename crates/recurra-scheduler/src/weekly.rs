use std::fmt;

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use serde::{
    de::{self, MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::calendar::{
    floor_days, one_day, start_of_day, time_of_day, weekday_at, weekday_index, WEEKDAYS,
};
use crate::interval::TimeInterval;

const OFFSET_MINUTES_KEY: &str = "OffsetMinutes";

/// Time-of-day intervals keyed by weekday.
///
/// Intervals are kept at whole-hour alignment relative to their weekday; any
/// sub-hour part of an applied offset accumulates in `offset_minutes`
/// (`0..60`), which is added back when the set is matched against an instant.
///
/// An empty set carries no meaning of its own: a periodic rule reads it as
/// "no restriction", other callers may read it as "never".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklyIntervalSet {
    days: [Vec<TimeInterval>; 7],
    offset_minutes: i32,
}

impl WeeklyIntervalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `interval` to `day` as-is. Call [`Self::normalized`] once built.
    pub fn with_interval(mut self, day: Weekday, interval: TimeInterval) -> Self {
        self.days[weekday_index(day)].push(interval);
        self
    }

    pub fn intervals(&self, day: Weekday) -> &[TimeInterval] {
        &self.days[weekday_index(day)]
    }

    pub fn offset_minutes(&self) -> i32 {
        self.offset_minutes
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Vec::is_empty)
    }

    /// All `(weekday, interval)` pairs, Sunday first.
    pub fn iter(&self) -> impl Iterator<Item = (Weekday, &TimeInterval)> {
        WEEKDAYS
            .iter()
            .zip(self.days.iter())
            .flat_map(|(day, list)| list.iter().map(move |iv| (*day, iv)))
    }

    /// Split out-of-day intervals and merge touching ones without moving anything.
    pub fn normalized(&self) -> Self {
        self.shift_by_offset(Duration::zero())
    }

    /// Whether `at` falls inside any interval (boundaries included).
    pub fn contains_instant(&self, at: DateTime<Utc>) -> bool {
        let Some(local) = at.checked_sub_signed(self.minute_shift()) else {
            return false;
        };
        let idx = weekday_index(local.weekday());
        let tod = time_of_day(local);
        if self.days[idx].iter().any(|iv| iv.contains(tod, false)) {
            return true;
        }
        // midnight also closes the previous day's `..24:00` interval
        tod == Duration::zero()
            && self.days[(idx + 6) % 7]
                .iter()
                .any(|iv| iv.contains(one_day(), false))
    }

    /// Move every interval by `offset`.
    ///
    /// Whole hours move the intervals; leftover minutes accumulate in
    /// `offset_minutes`. Intervals pushed across midnight are split at the day
    /// boundary and reassigned to the neighbouring weekday, then every day is
    /// re-sorted and touching intervals are merged.
    pub fn shift_by_offset(&self, offset: Duration) -> Self {
        let mut hours = offset.num_hours();
        let mut minutes =
            i64::from(self.offset_minutes) + (offset - Duration::hours(hours)).num_minutes();
        hours += minutes.div_euclid(60);
        minutes = minutes.rem_euclid(60);
        let shift = Duration::hours(hours);

        let mut days: [Vec<TimeInterval>; 7] = Default::default();
        for (idx, list) in self.days.iter().enumerate() {
            for interval in list {
                for (day_delta, piece) in split_at_midnight(interval.shifted(shift)) {
                    let target = weekday_index(weekday_at(idx as i64 + day_delta));
                    days[target].push(piece);
                }
            }
        }
        for list in &mut days {
            merge_touching(list);
        }

        Self {
            days,
            offset_minutes: minutes as i32,
        }
    }

    /// Earliest instant at or after `from` at which some interval begins.
    ///
    /// A weekday whose begin has already passed in `from`'s week rolls over
    /// to the following week. `None` when the set is empty or the search
    /// leaves the representable range.
    pub fn next_window_start(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = from.checked_sub_signed(self.minute_shift())?;
        let today = weekday_index(local.weekday()) as i64;
        let midnight = start_of_day(local.date_naive());

        let mut best: Option<DateTime<Utc>> = None;
        for (idx, list) in self.days.iter().enumerate() {
            let ahead = (idx as i64 - today).rem_euclid(7);
            let Some(day_start) = midnight.checked_add_signed(Duration::days(ahead)) else {
                continue;
            };
            for interval in list {
                let Some(mut start) = day_start.checked_add_signed(interval.begin()) else {
                    continue;
                };
                if start < local {
                    match start.checked_add_signed(Duration::days(7)) {
                        Some(next_week) => start = next_week,
                        None => continue,
                    }
                }
                if best.map_or(true, |b| start < b) {
                    best = Some(start);
                }
            }
        }

        best?.checked_add_signed(self.minute_shift())
    }

    fn minute_shift(&self) -> Duration {
        Duration::minutes(i64::from(self.offset_minutes))
    }
}

/// Split `interval` at every midnight it crosses. Each piece comes back with
/// the number of days it moved relative to the interval's own day.
fn split_at_midnight(interval: TimeInterval) -> Vec<(i64, TimeInterval)> {
    let day = one_day();
    let end = interval.end();
    let mut begin = interval.begin();
    let mut pieces = Vec::with_capacity(2);
    loop {
        let day_delta = floor_days(begin);
        let day_start = Duration::days(day_delta);
        let piece_end = end.min(day_start + day);
        pieces.push((
            day_delta,
            TimeInterval::from_ordered(begin - day_start, piece_end - day_start),
        ));
        if piece_end >= end {
            break;
        }
        begin = piece_end;
    }
    pieces
}

fn merge_touching(list: &mut Vec<TimeInterval>) {
    if list.len() < 2 {
        return;
    }
    list.sort_by_key(|iv| (iv.begin(), iv.end()));
    let mut merged: Vec<TimeInterval> = Vec::with_capacity(list.len());
    for iv in list.drain(..) {
        match merged.last_mut() {
            Some(last) if iv.begin() <= last.end() => {
                *last = TimeInterval::from_ordered(last.begin(), last.end().max(iv.end()));
            }
            _ => merged.push(iv),
        }
    }
    *list = merged;
}

impl Serialize for WeeklyIntervalSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let non_empty = self.days.iter().filter(|d| !d.is_empty()).count();
        let mut map = serializer.serialize_map(Some(non_empty + 1))?;
        for (day, list) in WEEKDAYS.iter().zip(self.days.iter()) {
            if !list.is_empty() {
                map.serialize_entry(&weekday_name(*day), list)?;
            }
        }
        map.serialize_entry(OFFSET_MINUTES_KEY, &self.offset_minutes)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for WeeklyIntervalSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(WeeklyVisitor)
    }
}

struct WeeklyVisitor;

impl<'de> Visitor<'de> for WeeklyVisitor {
    type Value = WeeklyIntervalSet;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of weekday names to interval lists")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut set = WeeklyIntervalSet::default();
        while let Some(key) = access.next_key::<String>()? {
            if key.eq_ignore_ascii_case(OFFSET_MINUTES_KEY) {
                let minutes: i32 = access.next_value()?;
                if !(0..60).contains(&minutes) {
                    return Err(de::Error::custom(format!(
                        "OffsetMinutes must be within 0..60, got {minutes}"
                    )));
                }
                set.offset_minutes = minutes;
                continue;
            }
            let day = parse_weekday_key(&key)
                .ok_or_else(|| de::Error::custom(format!("unknown weekday key: {key}")))?;
            let list: Option<Vec<TimeInterval>> = access.next_value()?;
            set.days[weekday_index(day)].extend(list.unwrap_or_default());
        }
        Ok(set)
    }
}

/// Accepts weekday names in any case ("Monday", "mon") or a stored index.
fn parse_weekday_key(key: &str) -> Option<Weekday> {
    if let Ok(index) = key.parse::<u8>() {
        return WEEKDAYS.get(usize::from(index)).copied();
    }
    key.parse::<Weekday>().ok()
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}
