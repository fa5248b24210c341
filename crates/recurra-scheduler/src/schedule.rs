use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Utc};
use tracing::{debug, warn};

use crate::calendar::{add_months, is_never, start_of_day, NEVER};
use crate::clock::Clock;
use crate::types::{DailyRule, DelayedRule, MonthlyRule, PeriodicRule, RecurrenceRule};

/// Weekday search horizon for daily rules.
const DAILY_HORIZON_DAYS: u64 = 7;
/// Month search horizon for monthly rules.
const MONTHLY_HORIZON_MONTHS: u32 = 12;

impl RecurrenceRule {
    /// First run strictly after `prev` (at or after it for `Delayed`).
    ///
    /// Returns [`NEVER`] when the rule has no occurrence within its search
    /// horizon, or when the next occurrence would not be representable.
    pub fn next_run(&self, prev: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            RecurrenceRule::Delayed(rule) => rule.next_run(prev),
            RecurrenceRule::Daily(rule) => rule.next_run(prev),
            RecurrenceRule::Periodic(rule) => rule.next_run(prev),
            RecurrenceRule::Monthly(rule) => rule.next_run(prev),
        }
    }

    /// First scheduled occurrence counted from `now_hint` (the clock's now when
    /// absent). An occurrence that already lies before the clock's now is
    /// rolled forward to the following one. `None` once the rule is exhausted.
    pub fn initial_run(
        &self,
        now_hint: Option<DateTime<Utc>>,
        clock: &dyn Clock,
    ) -> Option<DateTime<Utc>> {
        let now = clock.now();
        let base = now_hint.unwrap_or(now);

        let mut first = self.first_at_or_after(base);
        if first < now {
            debug!(naive = %first, %now, "initial occurrence already past, rolling forward");
            first = match self {
                RecurrenceRule::Periodic(rule) => rule.roll_forward(base, now),
                _ => self.first_at_or_after(now),
            };
        }
        (!is_never(first)).then_some(first)
    }

    /// Whether the rule allows a run at the clock's current instant.
    pub fn permitted_now(&self, clock: &dyn Clock) -> bool {
        self.permitted_at(clock.now())
    }

    /// Whether `at` satisfies the rule's recurrence and, for periodic rules,
    /// its weekly window.
    ///
    /// Daily rules permit any time on a selected weekday; monthly rules any
    /// time on the resolved day of a selected month; delayed rules any time
    /// from `run_at` on.
    pub fn permitted_at(&self, at: DateTime<Utc>) -> bool {
        match self {
            RecurrenceRule::Delayed(rule) => at >= rule.run_at,
            RecurrenceRule::Daily(rule) => rule.runs_on(at.weekday()),
            RecurrenceRule::Periodic(rule) => {
                rule.window.is_empty() || rule.window.contains_instant(at)
            }
            RecurrenceRule::Monthly(rule) => {
                rule.months.contains(&at.month())
                    && rule.day_of_month.resolve(at.year(), at.month()) == Some(at.day())
            }
        }
    }

    fn first_at_or_after(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            RecurrenceRule::Periodic(rule) => rule.align_to_window(at),
            _ => match at.checked_sub_signed(Duration::nanoseconds(1)) {
                Some(just_before) => self.next_run(just_before),
                None => NEVER,
            },
        }
    }
}

impl DelayedRule {
    pub fn next_run(&self, prev: DateTime<Utc>) -> DateTime<Utc> {
        if prev <= self.run_at {
            self.run_at
        } else {
            NEVER
        }
    }
}

impl DailyRule {
    pub fn next_run(&self, prev: DateTime<Utc>) -> DateTime<Utc> {
        if self.days.is_empty() {
            debug!("daily rule has no weekdays selected");
            return NEVER;
        }
        let date = prev.date_naive();
        for add_days in 0..=DAILY_HORIZON_DAYS {
            let Some(day) = date.checked_add_days(Days::new(add_days)) else {
                warn!(%prev, add_days, "daily next run exceeds the representable range");
                return NEVER;
            };
            if !self.runs_on(day.weekday()) {
                continue;
            }
            let Some(candidate) = at_time(day, self.time) else {
                warn!(%prev, add_days, "daily next run exceeds the representable range");
                return NEVER;
            };
            if candidate > prev {
                return candidate;
            }
        }
        NEVER
    }
}

impl MonthlyRule {
    pub fn next_run(&self, prev: DateTime<Utc>) -> DateTime<Utc> {
        if self.months.is_empty() {
            debug!("monthly rule has no months selected");
            return NEVER;
        }
        for add in 0..=MONTHLY_HORIZON_MONTHS {
            let Some((year, month)) = add_months(prev.year(), prev.month(), add) else {
                break;
            };
            if !self.months.contains(&month) {
                continue;
            }
            let Some(day) = self.day_of_month.resolve(year, month) else {
                continue;
            };
            let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
                warn!(%prev, year, month, "monthly next run exceeds the representable range");
                return NEVER;
            };
            let Some(candidate) = at_time(date, self.time) else {
                warn!(%prev, year, month, "monthly next run exceeds the representable range");
                return NEVER;
            };
            if candidate > prev {
                return candidate;
            }
        }
        NEVER
    }
}

impl PeriodicRule {
    pub fn next_run(&self, prev: DateTime<Utc>) -> DateTime<Utc> {
        let Some(candidate) = self.step().and_then(|step| prev.checked_add_signed(step)) else {
            warn!(%prev, value = self.value, "periodic next run exceeds the representable range");
            return NEVER;
        };
        self.align_to_window(candidate)
    }

    /// `at` itself when the window allows it, otherwise the next window start.
    fn align_to_window(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        if self.window.is_empty() || self.window.contains_instant(at) {
            return at;
        }
        self.window.next_window_start(at).unwrap_or(NEVER)
    }

    /// First `base + k * step` at or after `now`, aligned to the window.
    fn roll_forward(&self, base: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
        let Some(step) = self.step() else {
            return NEVER;
        };
        let behind = now - base;
        let (Some(behind_ns), Some(step_ns)) = (behind.num_nanoseconds(), step.num_nanoseconds())
        else {
            return self.align_to_window(now);
        };
        let steps = behind_ns.saturating_add(step_ns - 1) / step_ns;
        let rolled = steps
            .checked_mul(step_ns)
            .map(Duration::nanoseconds)
            .and_then(|span| base.checked_add_signed(span));
        match rolled {
            Some(at) => self.align_to_window(at),
            None => NEVER,
        }
    }

    fn step(&self) -> Option<Duration> {
        self.unit.span(self.value)
    }
}

fn at_time(date: NaiveDate, time: Duration) -> Option<DateTime<Utc>> {
    start_of_day(date).checked_add_signed(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::interval::TimeInterval;
    use crate::types::{DayOfMonth, PeriodUnit};
    use crate::weekly::WeeklyIntervalSet;
    use chrono::{TimeZone, Weekday};
    use proptest::prelude::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn hm(h: i64, m: i64) -> Duration {
        Duration::hours(h) + Duration::minutes(m)
    }

    fn daily(days: &[Weekday], h: i64, m: i64) -> RecurrenceRule {
        RecurrenceRule::Daily(DailyRule::new(days.iter().copied(), hm(h, m)))
    }

    fn monthly(day: DayOfMonth, h: i64, months: &[u32]) -> RecurrenceRule {
        RecurrenceRule::Monthly(
            MonthlyRule::new(day, Duration::hours(h), months.iter().copied()).unwrap(),
        )
    }

    fn periodic(unit: PeriodUnit, value: u32, window: WeeklyIntervalSet) -> RecurrenceRule {
        RecurrenceRule::Periodic(PeriodicRule::new(unit, value, window).unwrap())
    }

    // 2024-01-01 is a Monday.

    #[test]
    fn daily_later_today() {
        let rule = daily(&[Weekday::Mon], 18, 30);
        assert_eq!(rule.next_run(utc(2024, 1, 1, 9, 0)), utc(2024, 1, 1, 18, 30));
    }

    #[test]
    fn daily_exact_time_moves_to_next_week() {
        let rule = daily(&[Weekday::Mon], 18, 30);
        assert_eq!(rule.next_run(utc(2024, 1, 1, 18, 30)), utc(2024, 1, 8, 18, 30));
    }

    #[test]
    fn daily_skips_unselected_weekdays() {
        let rule = daily(&[Weekday::Mon, Weekday::Fri], 6, 0);
        assert_eq!(rule.next_run(utc(2024, 1, 1, 7, 0)), utc(2024, 1, 5, 6, 0));
        assert_eq!(rule.next_run(utc(2024, 1, 5, 7, 0)), utc(2024, 1, 8, 6, 0));
    }

    #[test]
    fn daily_without_days_never_runs() {
        let rule = daily(&[], 6, 0);
        assert_eq!(rule.next_run(utc(2024, 1, 1, 7, 0)), NEVER);
    }

    #[test]
    fn daily_near_max_instant_is_never() {
        let rule = daily(&[Weekday::Mon, Weekday::Tue, Weekday::Wed], 6, 0);
        assert_eq!(rule.next_run(NEVER), NEVER);
    }

    #[test]
    fn monthly_last_day_of_february() {
        let rule = monthly(DayOfMonth::Last, 0, &[2]);
        assert_eq!(rule.next_run(utc(2023, 1, 1, 0, 0)), utc(2023, 2, 28, 0, 0));
        assert_eq!(rule.next_run(utc(2024, 1, 1, 0, 0)), utc(2024, 2, 29, 0, 0));
    }

    #[test]
    fn monthly_skips_short_months() {
        let rule = monthly(DayOfMonth::Day(31), 9, &[2, 3, 4, 5]);
        assert_eq!(rule.next_run(utc(2024, 1, 15, 0, 0)), utc(2024, 3, 31, 9, 0));
        assert_eq!(rule.next_run(utc(2024, 3, 31, 9, 0)), utc(2024, 5, 31, 9, 0));
    }

    #[test]
    fn monthly_rolls_into_next_year() {
        let rule = monthly(DayOfMonth::Day(5), 12, &[2, 3]);
        assert_eq!(rule.next_run(utc(2024, 3, 5, 12, 0)), utc(2025, 2, 5, 12, 0));
    }

    #[test]
    fn monthly_day_that_never_exists_is_never() {
        let rule = monthly(DayOfMonth::Day(30), 0, &[2]);
        assert_eq!(rule.next_run(utc(2024, 1, 1, 0, 0)), NEVER);
    }

    #[test]
    fn periodic_without_window_is_pure_arithmetic() {
        let rule = periodic(PeriodUnit::Hour, 3, WeeklyIntervalSet::new());
        let t = utc(2024, 1, 1, 22, 17);
        assert_eq!(rule.next_run(t), t + Duration::hours(3));
        assert_eq!(rule.next_run(NEVER), NEVER);
    }

    #[test]
    fn periodic_waits_for_window() {
        let window = WeeklyIntervalSet::new()
            .with_interval(Weekday::Mon, TimeInterval::hours(9, 17).unwrap())
            .with_interval(Weekday::Tue, TimeInterval::hours(9, 17).unwrap());
        let rule = periodic(PeriodUnit::Minute, 30, window);

        assert_eq!(rule.next_run(utc(2024, 1, 1, 10, 0)), utc(2024, 1, 1, 10, 30));
        assert_eq!(rule.next_run(utc(2024, 1, 1, 16, 45)), utc(2024, 1, 2, 9, 0));
        assert_eq!(rule.next_run(utc(2024, 1, 2, 17, 0)), utc(2024, 1, 8, 9, 0));
    }

    #[test]
    fn delayed_fires_once() {
        let run_at = utc(2024, 6, 1, 12, 0);
        let rule = RecurrenceRule::Delayed(DelayedRule::new(run_at));
        assert_eq!(rule.next_run(utc(2024, 5, 1, 0, 0)), run_at);
        assert_eq!(rule.next_run(run_at), run_at);
        assert_eq!(rule.next_run(run_at + Duration::seconds(1)), NEVER);
    }

    #[test]
    fn initial_run_uses_today_when_still_ahead() {
        let rule = daily(&[Weekday::Mon], 18, 0);
        let clock = FixedClock(utc(2024, 1, 1, 9, 0));
        assert_eq!(rule.initial_run(None, &clock), Some(utc(2024, 1, 1, 18, 0)));
    }

    #[test]
    fn initial_run_counts_exact_time_as_due() {
        let rule = daily(&[Weekday::Mon], 18, 0);
        let clock = FixedClock(utc(2024, 1, 1, 18, 0));
        assert_eq!(rule.initial_run(None, &clock), Some(utc(2024, 1, 1, 18, 0)));
    }

    #[test]
    fn initial_run_rolls_stale_hint_forward() {
        let rule = daily(&[Weekday::Mon], 18, 0);
        let clock = FixedClock(utc(2024, 1, 2, 9, 0));
        let hint = Some(utc(2024, 1, 1, 0, 0));
        assert_eq!(rule.initial_run(hint, &clock), Some(utc(2024, 1, 8, 18, 0)));
    }

    #[test]
    fn initial_run_periodic_rolls_by_whole_steps() {
        let rule = periodic(PeriodUnit::Hour, 2, WeeklyIntervalSet::new());
        let clock = FixedClock(utc(2024, 1, 1, 9, 30));
        let hint = Some(utc(2024, 1, 1, 6, 0));
        assert_eq!(rule.initial_run(hint, &clock), Some(utc(2024, 1, 1, 10, 0)));
        assert_eq!(rule.initial_run(None, &clock), Some(utc(2024, 1, 1, 9, 30)));
    }

    #[test]
    fn initial_run_of_past_delayed_rule_is_none() {
        let rule = RecurrenceRule::Delayed(DelayedRule::new(utc(2024, 1, 1, 0, 0)));
        let clock = FixedClock(utc(2024, 2, 1, 0, 0));
        assert_eq!(rule.initial_run(None, &clock), None);

        let future = RecurrenceRule::Delayed(DelayedRule::new(utc(2024, 3, 1, 0, 0)));
        assert_eq!(future.initial_run(None, &clock), Some(utc(2024, 3, 1, 0, 0)));
    }

    #[test]
    fn permitted_now_follows_window() {
        let window = WeeklyIntervalSet::new()
            .with_interval(Weekday::Mon, TimeInterval::hours(9, 17).unwrap());
        let rule = periodic(PeriodUnit::Hour, 1, window);
        assert!(rule.permitted_now(&FixedClock(utc(2024, 1, 1, 12, 0))));
        assert!(!rule.permitted_now(&FixedClock(utc(2024, 1, 1, 18, 0))));
        assert!(!rule.permitted_now(&FixedClock(utc(2024, 1, 2, 12, 0))));

        let open = periodic(PeriodUnit::Hour, 1, WeeklyIntervalSet::new());
        assert!(open.permitted_now(&FixedClock(utc(2024, 1, 2, 3, 0))));
    }

    #[test]
    fn permitted_at_for_calendar_rules() {
        let rule = daily(&[Weekday::Mon], 18, 0);
        assert!(rule.permitted_at(utc(2024, 1, 1, 2, 0)));
        assert!(!rule.permitted_at(utc(2024, 1, 2, 18, 0)));

        let rule = monthly(DayOfMonth::Last, 0, &[2]);
        assert!(rule.permitted_at(utc(2024, 2, 29, 10, 0)));
        assert!(!rule.permitted_at(utc(2024, 2, 28, 10, 0)));

        let rule = RecurrenceRule::Delayed(DelayedRule::new(utc(2024, 1, 1, 0, 0)));
        assert!(!rule.permitted_at(utc(2023, 12, 31, 0, 0)));
        assert!(rule.permitted_at(utc(2024, 1, 1, 0, 0)));
    }

    fn arb_daily() -> impl Strategy<Value = RecurrenceRule> {
        (prop::array::uniform7(any::<bool>()), 0i64..24 * 60).prop_map(|(picked, minutes)| {
            let days = crate::calendar::WEEKDAYS
                .iter()
                .zip(picked)
                .filter_map(|(day, on)| on.then_some(*day));
            RecurrenceRule::Daily(DailyRule::new(days, Duration::minutes(minutes)))
        })
    }

    proptest! {
        #[test]
        fn daily_next_run_is_strictly_later(rule in arb_daily(), secs in 0i64..4_000_000_000) {
            let prev = DateTime::<Utc>::from_timestamp(secs, 0).unwrap();
            let next = rule.next_run(prev);
            prop_assert!(next > prev);
        }
    }
}
