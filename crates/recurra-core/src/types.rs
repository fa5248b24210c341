use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RecurraError;

/// How a scheduled job starts.
///
/// Stored by name (`"Recurring"`) in JSON, by numeric code in older rows;
/// both forms are accepted on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "DiscriminatorRepr", into = "String")]
pub enum StartupType {
    /// Runs as soon as it is submitted; carries no parameters.
    Immediate,
    /// Runs once at a stored instant.
    Delayed,
    /// Runs according to an [`OccurrenceType`].
    Recurring,
}

impl StartupType {
    pub fn code(self) -> u8 {
        match self {
            StartupType::Immediate => 0,
            StartupType::Delayed => 1,
            StartupType::Recurring => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(StartupType::Immediate),
            1 => Some(StartupType::Delayed),
            2 => Some(StartupType::Recurring),
            _ => None,
        }
    }
}

impl fmt::Display for StartupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StartupType::Immediate => "Immediate",
            StartupType::Delayed => "Delayed",
            StartupType::Recurring => "Recurring",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for StartupType {
    type Err = RecurraError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "immediate" => Ok(StartupType::Immediate),
            "delayed" => Ok(StartupType::Delayed),
            "recurring" => Ok(StartupType::Recurring),
            _ => Err(RecurraError::UnknownDiscriminator {
                kind: "startup type",
                value: s.to_string(),
            }),
        }
    }
}

/// Recurrence mode of a [`StartupType::Recurring`] schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "DiscriminatorRepr", into = "String")]
pub enum OccurrenceType {
    None,
    Daily,
    Periodic,
    Monthly,
}

impl OccurrenceType {
    pub fn code(self) -> u8 {
        match self {
            OccurrenceType::None => 0,
            OccurrenceType::Daily => 1,
            OccurrenceType::Periodic => 2,
            OccurrenceType::Monthly => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(OccurrenceType::None),
            1 => Some(OccurrenceType::Daily),
            2 => Some(OccurrenceType::Periodic),
            3 => Some(OccurrenceType::Monthly),
            _ => None,
        }
    }
}

impl fmt::Display for OccurrenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OccurrenceType::None => "None",
            OccurrenceType::Daily => "Daily",
            OccurrenceType::Periodic => "Periodic",
            OccurrenceType::Monthly => "Monthly",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for OccurrenceType {
    type Err = RecurraError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(OccurrenceType::None),
            "daily" => Ok(OccurrenceType::Daily),
            // "Interval" is the legacy name of the periodic mode.
            "periodic" | "interval" => Ok(OccurrenceType::Periodic),
            "monthly" => Ok(OccurrenceType::Monthly),
            _ => Err(RecurraError::UnknownDiscriminator {
                kind: "occurrence type",
                value: s.to_string(),
            }),
        }
    }
}

/// Wire form shared by both discriminators: a name or a numeric code.
#[derive(Deserialize)]
#[serde(untagged)]
enum DiscriminatorRepr {
    Code(u8),
    Name(String),
}

impl TryFrom<DiscriminatorRepr> for StartupType {
    type Error = RecurraError;

    fn try_from(repr: DiscriminatorRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            DiscriminatorRepr::Code(code) => {
                Self::from_code(code).ok_or_else(|| RecurraError::UnknownDiscriminator {
                    kind: "startup type",
                    value: code.to_string(),
                })
            }
            DiscriminatorRepr::Name(name) => name.parse(),
        }
    }
}

impl TryFrom<DiscriminatorRepr> for OccurrenceType {
    type Error = RecurraError;

    fn try_from(repr: DiscriminatorRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            DiscriminatorRepr::Code(code) => {
                Self::from_code(code).ok_or_else(|| RecurraError::UnknownDiscriminator {
                    kind: "occurrence type",
                    value: code.to_string(),
                })
            }
            DiscriminatorRepr::Name(name) => name.parse(),
        }
    }
}

impl From<StartupType> for String {
    fn from(value: StartupType) -> Self {
        value.to_string()
    }
}

impl From<OccurrenceType> for String {
    fn from(value: OccurrenceType) -> Self {
        value.to_string()
    }
}

/// A stored schedule row as handed to the engine by its owner.
///
/// The engine only reads the discriminators and `params`; identity fields are
/// carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tenant: Option<String>,
    pub startup_type: StartupType,
    #[serde(default = "default_occurrence")]
    pub occurrence_type: OccurrenceType,
    /// Raw JSON parameters. `None` / blank for `Immediate` schedules.
    #[serde(default)]
    pub params: Option<String>,
}

fn default_occurrence() -> OccurrenceType {
    OccurrenceType::None
}
