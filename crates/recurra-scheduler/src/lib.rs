//! `recurra-scheduler`: recurrence rules, weekly windows and their stored
//! JSON form.
//!
//! # Overview
//!
//! A schedule is stored as a `(StartupType, OccurrenceType, params)` triple.
//! [`codec::decode`] turns it into a [`RecurrenceRule`], which answers the
//! engine's two questions: when does it fire next ([`RecurrenceRule::next_run`])
//! and may it fire now ([`RecurrenceRule::permitted_now`]). Rules are kept in
//! UTC; [`RecurrenceRule::to_user_offset`] and [`RecurrenceRule::to_utc`]
//! convert them for display and editing.
//!
//! # Rule variants
//!
//! | Variant    | Behaviour                                                   |
//! |------------|-------------------------------------------------------------|
//! | `Delayed`  | Single fire at an absolute UTC instant                      |
//! | `Daily`    | Fire at a time of day on selected weekdays                  |
//! | `Periodic` | Repeat every N hours or minutes, optionally inside a window |
//! | `Monthly`  | Fire at a time of day on one day of selected months         |
//!
//! "No next run" is reported as [`NEVER`], the largest representable instant.

pub mod calendar;
pub mod clock;
pub mod codec;
pub mod describe;
pub mod error;
pub mod interval;
pub mod offset;
pub mod ranges;
pub mod schedule;
pub mod timespan;
pub mod types;
pub mod weekly;

pub use calendar::{is_never, NEVER};
pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::{decode, decode_record, encode, encode_into, EncodedRule};
pub use error::{Result, SchedulerError};
pub use interval::TimeInterval;
pub use ranges::group_ranges;
pub use types::{
    DailyRule, DayOfMonth, DelayedRule, MonthlyRule, PeriodUnit, PeriodicRule, RecurrenceRule,
};
pub use weekly::WeeklyIntervalSet;
