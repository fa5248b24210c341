//! Human-readable schedule summaries for listings and edit forms.

use chrono::{Duration, NaiveTime};
use recurra_core::ClockFormat;

use crate::ranges::{group_ranges, run_len};
use crate::types::{
    DailyRule, DayOfMonth, DelayedRule, MonthlyRule, PeriodUnit, PeriodicRule, RecurrenceRule,
};

const SHORT_WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const LONG_WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];
const SHORT_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const LONG_MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Shortest run rendered as `first-last`; shorter runs list each item.
const MIN_RANGE_RUN: i32 = 3;

impl RecurrenceRule {
    /// Summary with a 12-hour clock, e.g. "Run at 06:30 PM on Mon-Fri".
    pub fn describe(&self) -> String {
        self.describe_with(ClockFormat::TwelveHour)
    }

    pub fn describe_with(&self, clock: ClockFormat) -> String {
        match self {
            RecurrenceRule::Delayed(rule) => describe_delayed(rule, clock),
            RecurrenceRule::Daily(rule) => describe_daily(rule, clock),
            RecurrenceRule::Periodic(rule) => describe_periodic(rule),
            RecurrenceRule::Monthly(rule) => describe_monthly(rule, clock),
        }
    }
}

fn describe_delayed(rule: &DelayedRule, clock: ClockFormat) -> String {
    let at = rule.run_at();
    let time = at.time() - NaiveTime::MIN;
    format!(
        "Run once on {} at {} UTC",
        at.format("%Y-%m-%d"),
        format_time(time, clock)
    )
}

fn describe_daily(rule: &DailyRule, clock: ClockFormat) -> String {
    let time = format_time(rule.time, clock);
    let days: Vec<i32> = rule.days.iter().map(|d| i32::from(*d)).collect();
    match days.len() {
        0 => "Never run (no days selected)".to_string(),
        1 => format!("Run at {time} on {}", LONG_WEEKDAYS[days[0] as usize]),
        7 => format!("Run at {time} daily"),
        6 => format!("Run at {time} on every day except {}", excluded_weekdays(&days)),
        5 if group_ranges(&days, 7).len() > 1 => {
            format!("Run at {time} on every day except {}", excluded_weekdays(&days))
        }
        _ => format!(
            "Run at {time} on {}",
            render_runs(&days, 7, 0, |d| SHORT_WEEKDAYS[d as usize])
        ),
    }
}

fn excluded_weekdays(days: &[i32]) -> String {
    (0..7)
        .filter(|d| !days.contains(d))
        .map(|d| SHORT_WEEKDAYS[d as usize])
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_periodic(rule: &PeriodicRule) -> String {
    let every = match (rule.unit, rule.value) {
        (PeriodUnit::Hour, 1) => "hour".to_string(),
        (PeriodUnit::Hour, n) => format!("{n} hours"),
        (PeriodUnit::Minute, 1) => "minute".to_string(),
        (PeriodUnit::Minute, n) => format!("{n} minutes"),
    };
    if rule.window.is_empty() {
        format!("Run every {every}")
    } else {
        format!("Run every {every} at selected intervals")
    }
}

fn describe_monthly(rule: &MonthlyRule, clock: ClockFormat) -> String {
    let time = format_time(rule.time, clock);
    let day = match rule.day_of_month {
        DayOfMonth::Day(d) => ordinal(d),
        // a negative time lands on the evening before the last day
        DayOfMonth::Last if rule.time < Duration::zero() => "day before the last day".to_string(),
        DayOfMonth::Last => "last day".to_string(),
    };
    let months: Vec<i32> = rule.months.iter().map(|m| *m as i32).collect();
    let which = match months.len() {
        0 => return "Never run (no months selected)".to_string(),
        1 => LONG_MONTHS[months[0] as usize - 1].to_string(),
        12 => "every month".to_string(),
        9..=11 => {
            let excluded: Vec<&str> = (1..=12)
                .filter(|m| !months.contains(m))
                .map(|m| SHORT_MONTHS[m as usize - 1])
                .collect();
            format!("every month except {}", excluded.join(", "))
        }
        _ => render_runs(&months, 12, 1, |m| SHORT_MONTHS[m as usize - 1]),
    };
    format!("Run at {time} on {day} of {which}")
}

/// Render sorted values as grouped runs: `Mon-Fri`, `Feb, Mar`, `Sat-Mon`.
fn render_runs(values: &[i32], modulus: i32, base: i32, name: impl Fn(i32) -> &'static str) -> String {
    let zero_based: Vec<i32> = values.iter().map(|v| v - base).collect();
    let mut parts = Vec::new();
    for run in group_ranges(&zero_based, modulus) {
        let len = run_len(run, modulus);
        if len >= MIN_RANGE_RUN {
            parts.push(format!("{}-{}", name(run.0 + base), name(run.1 + base)));
        } else {
            for step in 0..len {
                parts.push(name((run.0 + step).rem_euclid(modulus) + base).to_string());
            }
        }
    }
    parts.join(", ")
}

fn format_time(time: Duration, clock: ClockFormat) -> String {
    let secs = time.num_seconds().rem_euclid(24 * 60 * 60) as u32;
    let Some(t) = NaiveTime::from_num_seconds_from_midnight_opt(secs, 0) else {
        return String::new();
    };
    match clock {
        ClockFormat::TwelveHour => t.format("%I:%M %p").to_string(),
        ClockFormat::TwentyFourHour => t.format("%H:%M").to_string(),
    }
}

fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}
