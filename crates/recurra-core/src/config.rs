use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOG_FILTER: &str = "recurra=info";
/// Largest offset accepted from config, in minutes (UTC-14:00 .. UTC+14:00).
pub const MAX_OFFSET_MINUTES: i32 = 14 * 60;

/// Top-level config (recurra.toml + RECURRA_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecurraConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub describe: DescribeConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// User UTC offset applied when a command does not pass one explicitly.
    /// Override with env var: RECURRA_ENGINE__DEFAULT_OFFSET_MINUTES=120
    #[serde(default)]
    pub default_offset_minutes: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DescribeConfig {
    #[serde(default)]
    pub clock: ClockFormat,
}

/// How times of day are rendered in schedule descriptions.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ClockFormat {
    /// `06:30 PM`
    #[default]
    TwelveHour,
    /// `18:30`
    TwentyFourHour,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber` filter directive used when RUST_LOG is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl RecurraConfig {
    /// Load config from a TOML file with RECURRA_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.recurra/recurra.toml
    ///
    /// A missing file is not an error; env overrides and defaults still apply.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: RecurraConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("RECURRA_").split("__"))
            .extract()
            .map_err(|e| crate::error::RecurraError::Config(e.to_string()))?;

        config.validate()?;
        tracing::debug!(path = %path, "configuration loaded");
        Ok(config)
    }

    fn validate(&self) -> crate::error::Result<()> {
        let offset = self.engine.default_offset_minutes;
        if offset.abs() > MAX_OFFSET_MINUTES {
            return Err(crate::error::RecurraError::Config(format!(
                "engine.default_offset_minutes {offset} is outside ±{MAX_OFFSET_MINUTES}"
            )));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.recurra/recurra.toml", home)
}
