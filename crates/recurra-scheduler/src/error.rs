use chrono::Duration;
use recurra_core::{OccurrenceType, StartupType};
use thiserror::Error;

/// Errors that can occur within the scheduling engine.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// An interval's end lies before its begin.
    #[error("Invalid interval: end {end} is before begin {begin}")]
    InvalidInterval { begin: Duration, end: Duration },

    /// A recurrence parameter is out of range (zero period, unknown unit,
    /// day of month or month outside the calendar).
    #[error("Invalid recurrence value: {0}")]
    InvalidRecurrenceValue(String),

    /// The discriminator requires a parameter payload but none was stored.
    #[error("Missing schedule parameters for {startup}/{occurrence}")]
    MissingParams {
        startup: StartupType,
        occurrence: OccurrenceType,
    },

    /// The discriminator pair does not name a decodable rule.
    #[error("Invalid discriminator: {startup}/{occurrence}")]
    InvalidDiscriminator {
        startup: StartupType,
        occurrence: OccurrenceType,
    },

    /// A time-of-day string is not in `[-][d.]hh:mm:ss[.fffffff]` form.
    #[error("Invalid time span: {0}")]
    InvalidTimeSpan(String),

    /// Malformed JSON payload.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
