//! `recurra-core`: configuration, errors and stored-record types shared by
//! the scheduling engine and its command-line front end.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ClockFormat, RecurraConfig};
pub use error::{RecurraError, Result};
pub use types::{OccurrenceType, ScheduleRecord, StartupType};
