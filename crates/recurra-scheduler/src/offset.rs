//! Conversion of rule times between UTC storage and a user's fixed offset.
//!
//! Shifting a time of day can push it past midnight. Each variant then
//! brings the time back into `[0h, 24h)` and moves its day selectors by the
//! same number of days ("fix-up"). Some fix-ups cannot be expressed in the
//! stored model (the last day of a month moved backwards); those keep the
//! raw shifted time, which still resolves to the correct instant.

use chrono::Duration;
use tracing::{debug, warn};

use crate::calendar::floor_days;
use crate::types::{DailyRule, DayOfMonth, MonthlyRule, PeriodicRule, RecurrenceRule};

const MONTH_DAY_CYCLE: i64 = 31;

impl RecurrenceRule {
    /// Convert a rule entered at UTC`offset` into its UTC form.
    pub fn to_utc(&self, offset: Duration) -> Self {
        self.shifted(-offset)
    }

    /// Convert a stored UTC rule into the user's UTC`offset` view.
    pub fn to_user_offset(&self, offset: Duration) -> Self {
        self.shifted(offset)
    }

    fn shifted(&self, delta: Duration) -> Self {
        match self {
            // an absolute instant does not depend on the viewer's offset
            RecurrenceRule::Delayed(rule) => RecurrenceRule::Delayed(rule.clone()),
            RecurrenceRule::Daily(rule) => RecurrenceRule::Daily(rule.shifted(delta)),
            RecurrenceRule::Periodic(rule) => RecurrenceRule::Periodic(rule.shifted(delta)),
            RecurrenceRule::Monthly(rule) => RecurrenceRule::Monthly(rule.shifted(delta)),
        }
    }
}

impl DailyRule {
    fn shifted(&self, delta: Duration) -> Self {
        let raw = self.time + delta;
        let day_delta = floor_days(raw);
        if day_delta == 0 {
            return Self {
                days: self.days.clone(),
                time: raw,
            };
        }
        debug!(day_delta, "daily time crossed midnight, rotating weekdays");
        Self {
            days: self
                .days
                .iter()
                .map(|d| (i64::from(*d) + day_delta).rem_euclid(7) as u8)
                .collect(),
            time: raw - Duration::days(day_delta),
        }
    }
}

impl PeriodicRule {
    fn shifted(&self, delta: Duration) -> Self {
        Self {
            unit: self.unit,
            value: self.value,
            window: self.window.shift_by_offset(delta),
        }
    }
}

impl MonthlyRule {
    fn shifted(&self, delta: Duration) -> Self {
        let raw = self.time + delta;
        let day_delta = floor_days(raw);
        if day_delta == 0 {
            return Self {
                time: raw,
                ..self.clone()
            };
        }

        let (day_of_month, month_carry) = match self.day_of_month {
            DayOfMonth::Last if day_delta < 0 => {
                warn!(
                    day_delta,
                    "last-day-of-month rule moved before midnight; keeping unnormalized time"
                );
                return Self {
                    time: raw,
                    ..self.clone()
                };
            }
            // the day after the last day is the start of the next month
            DayOfMonth::Last => (DayOfMonth::Day(day_delta as u32), 1),
            DayOfMonth::Day(day) => {
                let shifted = i64::from(day) - 1 + day_delta;
                (
                    DayOfMonth::Day((shifted.rem_euclid(MONTH_DAY_CYCLE) + 1) as u32),
                    shifted.div_euclid(MONTH_DAY_CYCLE),
                )
            }
        };

        debug!(day_delta, month_carry, "monthly time crossed midnight, moving day of month");
        Self {
            day_of_month,
            time: raw - Duration::days(day_delta),
            months: self
                .months
                .iter()
                .map(|m| ((i64::from(*m) - 1 + month_carry).rem_euclid(12) + 1) as u32)
                .collect(),
        }
    }
}
