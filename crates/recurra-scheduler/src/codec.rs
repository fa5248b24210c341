//! Mapping between stored `(StartupType, OccurrenceType, params)` triples and
//! [`RecurrenceRule`] values.

use recurra_core::{OccurrenceType, ScheduleRecord, StartupType};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SchedulerError};
use crate::types::{
    DailyRule, DelayedRule, MonthlyRule, PeriodicRule, RawDaily, RawDelayed, RawMonthly,
    RawPeriodic, RecurrenceRule,
};

/// Canonical spelling of every payload field. Stored payloads are matched
/// against these without regard to case.
const FIELD_NAMES: &[&str] = &[
    "Days",
    "Time",
    "DayOfMonth",
    "TimeOfDay",
    "MonthList",
    "TimeIntervalType",
    "TimeIntervalValue",
    "DailyIntervals",
    "OffsetMinutes",
    "Begin",
    "End",
    "RunAtDateTime",
];

/// A rule flattened back into its stored form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRule {
    pub startup_type: StartupType,
    pub occurrence_type: OccurrenceType,
    pub params: String,
}

/// Decode a stored discriminator pair and payload.
///
/// `Ok(None)` for `Immediate` schedules, which carry no rule.
pub fn decode(
    startup: StartupType,
    occurrence: OccurrenceType,
    params: Option<&str>,
) -> Result<Option<RecurrenceRule>> {
    debug!(%startup, %occurrence, "decoding schedule parameters");
    let payload = || {
        params
            .map(str::trim)
            .filter(|p| !p.is_empty() && *p != "null")
            .ok_or(SchedulerError::MissingParams {
                startup,
                occurrence,
            })
    };

    let rule = match (startup, occurrence) {
        (StartupType::Immediate, _) => return Ok(None),
        (StartupType::Delayed, _) => {
            RecurrenceRule::Delayed(parse::<RawDelayed, DelayedRule>(payload()?)?)
        }
        (StartupType::Recurring, OccurrenceType::None) => {
            return Err(SchedulerError::InvalidDiscriminator {
                startup,
                occurrence,
            })
        }
        (StartupType::Recurring, OccurrenceType::Daily) => {
            RecurrenceRule::Daily(parse::<RawDaily, DailyRule>(payload()?)?)
        }
        (StartupType::Recurring, OccurrenceType::Periodic) => {
            RecurrenceRule::Periodic(parse::<RawPeriodic, PeriodicRule>(payload()?)?)
        }
        (StartupType::Recurring, OccurrenceType::Monthly) => {
            RecurrenceRule::Monthly(parse::<RawMonthly, MonthlyRule>(payload()?)?)
        }
    };
    Ok(Some(rule))
}

pub fn decode_record(record: &ScheduleRecord) -> Result<Option<RecurrenceRule>> {
    decode(
        record.startup_type,
        record.occurrence_type,
        record.params.as_deref(),
    )
}

pub fn encode(rule: &RecurrenceRule) -> Result<EncodedRule> {
    let (startup_type, occurrence_type, params) = match rule {
        RecurrenceRule::Delayed(r) => (
            StartupType::Delayed,
            OccurrenceType::None,
            serde_json::to_string(r)?,
        ),
        RecurrenceRule::Daily(r) => (
            StartupType::Recurring,
            OccurrenceType::Daily,
            serde_json::to_string(r)?,
        ),
        RecurrenceRule::Periodic(r) => (
            StartupType::Recurring,
            OccurrenceType::Periodic,
            serde_json::to_string(r)?,
        ),
        RecurrenceRule::Monthly(r) => (
            StartupType::Recurring,
            OccurrenceType::Monthly,
            serde_json::to_string(r)?,
        ),
    };
    Ok(EncodedRule {
        startup_type,
        occurrence_type,
        params,
    })
}

/// Replace `record`'s discriminators and params with the encoded `rule`,
/// keeping its identity fields.
pub fn encode_into(record: &ScheduleRecord, rule: &RecurrenceRule) -> Result<ScheduleRecord> {
    let encoded = encode(rule)?;
    Ok(ScheduleRecord {
        startup_type: encoded.startup_type,
        occurrence_type: encoded.occurrence_type,
        params: Some(encoded.params),
        ..record.clone()
    })
}

fn parse<R, T>(payload: &str) -> Result<T>
where
    R: DeserializeOwned,
    T: TryFrom<R, Error = SchedulerError>,
{
    let mut value: Value = serde_json::from_str(payload)?;
    canonicalize_keys(&mut value);
    let raw: R = serde_json::from_value(value)?;
    T::try_from(raw)
}

fn canonicalize_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let entries = std::mem::take(map);
            for (key, mut inner) in entries {
                canonicalize_keys(&mut inner);
                let canonical = FIELD_NAMES
                    .iter()
                    .find(|name| name.eq_ignore_ascii_case(&key))
                    .map_or(key, |name| (*name).to_string());
                map.insert(canonical, inner);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(canonicalize_keys),
        _ => {}
    }
}
