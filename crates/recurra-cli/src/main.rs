//! `recurra`: inspect a stored schedule record from the command line.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use recurra_core::{RecurraConfig, ScheduleRecord};
use recurra_scheduler::{decode_record, encode_into, Clock, FixedClock, RecurrenceRule, SystemClock};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Upper bound on `next --count`.
const MAX_LISTED_RUNS: usize = 1000;

/// Recurra: evaluate and convert stored recurrence schedules.
#[derive(Parser)]
#[command(name = "recurra", version, about)]
struct Cli {
    /// Path to TOML configuration file (default: $RECURRA_CONFIG, then ~/.recurra/recurra.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Schedule record JSON file, `-` for stdin.
    #[arg(short, long, global = true, default_value = "-")]
    record: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a human-readable summary of the schedule in the user's offset.
    Describe {
        /// User UTC offset, e.g. `+02:00`. Defaults to the configured offset.
        #[arg(long, value_parser = parse_offset, allow_hyphen_values = true)]
        offset: Option<Duration>,
    },

    /// List upcoming run times in UTC.
    Next {
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,

        /// Count from this instant instead of now.
        #[arg(long, value_parser = parse_instant)]
        from: Option<DateTime<Utc>>,
    },

    /// Report whether the schedule may run at an instant (default: now).
    Permitted {
        #[arg(long, value_parser = parse_instant)]
        at: Option<DateTime<Utc>>,
    },

    /// Re-encode the record between UTC storage and a user offset.
    Convert {
        /// User UTC offset, e.g. `-05:30`. Defaults to the configured offset.
        #[arg(long, value_parser = parse_offset, allow_hyphen_values = true)]
        offset: Option<Duration>,

        #[arg(long, value_enum)]
        to: Target,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Target {
    /// Stored form: shift user-entered times back to UTC.
    Utc,
    /// Display form: shift stored UTC times to the user's offset.
    User,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // load config: --config > RECURRA_CONFIG env > ~/.recurra/recurra.toml
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned())
        .or_else(|| std::env::var("RECURRA_CONFIG").ok());
    let loaded = RecurraConfig::load(config_path.as_deref());

    let fallback_filter = loaded
        .as_ref()
        .map(|c| c.log.filter.clone())
        .unwrap_or_else(|_| recurra_core::config::DEFAULT_LOG_FILTER.to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_filter)),
        )
        .init();

    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        RecurraConfig::default()
    });

    let record = read_record(&cli.record)?;
    let default_offset = Duration::minutes(i64::from(config.engine.default_offset_minutes));

    match cli.command {
        Command::Describe { offset } => {
            let Some(rule) = decode_record(&record)? else {
                println!("Run immediately");
                return Ok(());
            };
            let local = rule.to_user_offset(offset.unwrap_or(default_offset));
            println!("{}", local.describe_with(config.describe.clock));
        }
        Command::Next { count, from } => {
            let rule = require_rule(&record)?;
            for at in runs_from(&rule, from, count.min(MAX_LISTED_RUNS)) {
                println!("{}", at.to_rfc3339());
            }
        }
        Command::Permitted { at } => {
            let rule = require_rule(&record)?;
            let permitted = match at {
                Some(at) => rule.permitted_now(&FixedClock(at)),
                None => rule.permitted_now(&SystemClock),
            };
            println!("{permitted}");
        }
        Command::Convert { offset, to } => {
            let rule = require_rule(&record)?;
            let offset = offset.unwrap_or(default_offset);
            let converted = match to {
                Target::Utc => rule.to_utc(offset),
                Target::User => rule.to_user_offset(offset),
            };
            let updated = encode_into(&record, &converted)?;
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
    }
    Ok(())
}

fn read_record(source: &str) -> anyhow::Result<ScheduleRecord> {
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading schedule record from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("reading schedule record from {source}"))?
    };
    let record: ScheduleRecord =
        serde_json::from_str(&raw).context("parsing schedule record JSON")?;
    debug!(id = ?record.id, startup = %record.startup_type, "schedule record loaded");
    Ok(record)
}

fn require_rule(record: &ScheduleRecord) -> anyhow::Result<RecurrenceRule> {
    match decode_record(record)? {
        Some(rule) => Ok(rule),
        None => bail!(
            "{} schedules have no recurrence rule",
            record.startup_type
        ),
    }
}

/// Upcoming runs as seen from `from`, or from the system clock's now.
fn runs_from(rule: &RecurrenceRule, from: Option<DateTime<Utc>>, count: usize) -> Vec<DateTime<Utc>> {
    match from {
        Some(at) => upcoming_runs(rule, Some(at), count, &FixedClock(at)),
        None => upcoming_runs(rule, None, count, &SystemClock),
    }
}

/// The first `count` runs, starting from the initial run after `from`.
fn upcoming_runs(
    rule: &RecurrenceRule,
    from: Option<DateTime<Utc>>,
    count: usize,
    clock: &dyn Clock,
) -> Vec<DateTime<Utc>> {
    let mut runs = Vec::with_capacity(count);
    let mut next = rule.initial_run(from, clock);
    while let Some(at) = next {
        if runs.len() == count {
            break;
        }
        runs.push(at);
        let following = rule.next_run(at);
        next = (!recurra_scheduler::is_never(following)).then_some(following);
    }
    if runs.len() < count {
        info!(found = runs.len(), requested = count, "schedule has no further runs");
    }
    runs
}

/// `±HH:MM`, `±HH` or `Z`.
fn parse_offset(raw: &str) -> anyhow::Result<Duration> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("z") {
        return Ok(Duration::zero());
    }
    let (sign, body) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let (hours, minutes) = body.split_once(':').unwrap_or((body, "0"));
    let hours = i64::from(
        hours
            .parse::<u32>()
            .with_context(|| format!("invalid offset {raw:?}"))?,
    );
    let minutes = i64::from(
        minutes
            .parse::<u32>()
            .with_context(|| format!("invalid offset {raw:?}"))?,
    );
    if !(0..60).contains(&minutes) {
        bail!("invalid offset {raw:?}: minutes must be below 60");
    }
    let total = hours * 60 + minutes;
    if total > i64::from(recurra_core::config::MAX_OFFSET_MINUTES) {
        bail!("offset {raw:?} is outside ±14:00");
    }
    Ok(Duration::minutes(sign * total))
}

/// RFC 3339, or an offset-less timestamp read as UTC.
fn parse_instant(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .with_context(|| format!("invalid instant {raw:?}"))?;
    Ok(naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use recurra_scheduler::DailyRule;

    #[test]
    fn offsets_parse_with_sign_and_minutes() {
        assert_eq!(parse_offset("+02:00").unwrap(), Duration::hours(2));
        assert_eq!(parse_offset("-05:30").unwrap(), -Duration::minutes(330));
        assert_eq!(parse_offset("3").unwrap(), Duration::hours(3));
        assert_eq!(parse_offset("Z").unwrap(), Duration::zero());
        assert!(parse_offset("+02:75").is_err());
        assert!(parse_offset("+15:00").is_err());
        assert!(parse_offset("noon").is_err());
    }

    #[test]
    fn instants_accept_offsetless_form() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        assert_eq!(parse_instant("2024-01-01T09:00:00").unwrap(), expected);
        assert_eq!(parse_instant("2024-01-01T11:00:00+02:00").unwrap(), expected);
    }

    #[test]
    fn runs_from_a_past_instant_are_not_rolled_to_now() {
        let rule = RecurrenceRule::Daily(DailyRule::new([chrono::Weekday::Mon], Duration::hours(9)));
        // 2020-01-01 is a Wednesday
        let from = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            runs_from(&rule, Some(from), 2),
            vec![
                Utc.with_ymd_and_hms(2020, 1, 6, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2020, 1, 13, 9, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn upcoming_runs_follow_next_run() {
        let rule = RecurrenceRule::Daily(DailyRule::new(
            [chrono::Weekday::Mon, chrono::Weekday::Wed],
            Duration::hours(9),
        ));
        // 2024-01-01 is a Monday
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
        let runs = upcoming_runs(&rule, None, 3, &clock);
        assert_eq!(
            runs,
            vec![
                Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap(),
            ]
        );
    }
}
