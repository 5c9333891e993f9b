//! Settings loading.
//!
//! Settings come from an optional TOML file layered with `TABLEWATCH_*`
//! environment variables:
//!
//! ```toml
//! period = "10s"
//! tables = ["keyspace1.users", "keyspace1.orders"]
//! probe = "./awkscript.sh"
//! probe_timeout = "30s"
//! failure_backoff = "500ms"
//!
//! [output]
//! type = "file"
//! path = "tablestats.ndjson"
//! ```
//!
//! Nested keys use `__` in the environment (`TABLEWATCH_OUTPUT__TYPE=tcp`),
//! and `TABLEWATCH_TABLES` takes a comma-separated list.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;
use crate::output::Output;
use crate::probe::{CommandProbe, DEFAULT_PROBE};

/// Config file looked up (with any supported extension) when no path is given.
pub const DEFAULT_CONFIG: &str = "tablewatch";

const ENV_PREFIX: &str = "TABLEWATCH";

/// Everything the poller needs to start.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Time between polling cycles.
    #[serde(default = "default_period", deserialize_with = "de_duration")]
    pub period: Duration,

    /// Tables to poll, in order.
    #[serde(default)]
    pub tables: Vec<String>,

    /// Probe command, invoked as `<probe> <table>`.
    #[serde(default = "default_probe")]
    pub probe: PathBuf,

    /// Kill the probe if it runs longer than this.
    #[serde(default, deserialize_with = "de_opt_duration")]
    pub probe_timeout: Option<Duration>,

    /// Pause after a failed probe before moving to the next table.
    #[serde(default = "default_failure_backoff", deserialize_with = "de_duration")]
    pub failure_backoff: Duration,

    #[serde(default)]
    pub output: OutputSettings,
}

/// Where events are sent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputSettings {
    #[default]
    Stdout,
    File {
        path: PathBuf,
    },
    Tcp {
        addr: String,
    },
}

fn default_period() -> Duration {
    Duration::from_secs(10)
}

fn default_probe() -> PathBuf {
    PathBuf::from(DEFAULT_PROBE)
}

fn default_failure_backoff() -> Duration {
    Duration::from_millis(500)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            period: default_period(),
            tables: Vec::new(),
            probe: default_probe(),
            probe_timeout: None,
            failure_backoff: default_failure_backoff(),
            output: OutputSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from `path` (required to exist) or, if `None`, from
    /// `tablewatch.*` in the working directory if present, then apply the
    /// environment on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG).required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Apply command-line overrides on top of loaded settings, then validate
    /// the result.
    ///
    /// A non-empty `tables` replaces the configured list rather than
    /// extending it.
    pub fn apply_overrides(
        &mut self,
        tables: &[String],
        period: Option<&str>,
        probe: Option<&Path>,
    ) -> Result<(), ConfigError> {
        if !tables.is_empty() {
            self.tables = tables.to_vec();
        }
        if let Some(period) = period {
            self.period = parse_duration(period)?;
        }
        if let Some(probe) = probe {
            self.probe = probe.to_path_buf();
        }
        self.validate()
    }

    /// Reject settings the poller cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period.is_zero() {
            return Err(ConfigError::Invalid {
                key: "period",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.probe.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                key: "probe",
                reason: "must not be empty".to_string(),
            });
        }
        match &self.output {
            OutputSettings::File { path } if path.as_os_str().is_empty() => {
                Err(ConfigError::Invalid {
                    key: "output.path",
                    reason: "must not be empty".to_string(),
                })
            }
            OutputSettings::Tcp { addr } if addr.trim().is_empty() => Err(ConfigError::Invalid {
                key: "output.addr",
                reason: "must not be empty".to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Build the configured probe.
    pub fn command_probe(&self) -> CommandProbe {
        let probe = CommandProbe::new(&self.probe);
        match self.probe_timeout {
            Some(timeout) => probe.timeout(timeout),
            None => probe,
        }
    }

    /// Build the configured output.
    pub fn output(&self) -> Output {
        match &self.output {
            OutputSettings::Stdout => Output::Stdout,
            OutputSettings::File { path } => Output::file(path),
            OutputSettings::Tcp { addr } => Output::tcp(addr),
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("tables")
}

/// Suffix to nanoseconds multiplier (order matters: longer suffixes first)
const UNITS: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("µs", 1_000.0),
    ("us", 1_000.0),
    ("ms", 1_000_000.0),
    ("s", 1_000_000_000.0),
    ("m", 60_000_000_000.0),
    ("h", 3_600_000_000_000.0),
];

/// Parse duration strings like "10s", "500ms", "1.5m" or "2h".
///
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    let invalid = || ConfigError::Duration(s.to_string());

    let (value, multiplier) = UNITS
        .iter()
        .find_map(|(suffix, multiplier)| s.strip_suffix(suffix).map(|v| (v, *multiplier)))
        .unwrap_or((s, 1_000_000_000.0));

    let value: f64 = value.trim().parse().map_err(|_| invalid())?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos((value * multiplier) as u64))
}

fn de_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration(&raw).map_err(serde::de::Error::custom)
}

fn de_opt_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| parse_duration(&raw).map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let vars: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(vars))
    }

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tablewatch.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
    }

    #[test]
    fn test_parse_milliseconds() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn test_parse_microseconds() {
        assert_eq!(parse_duration("250µs").unwrap(), Duration::from_micros(250));
        assert_eq!(parse_duration("250us").unwrap(), Duration::from_micros(250));
    }

    #[test]
    fn test_parse_minutes_and_hours() {
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn bare_number_is_seconds() {
        assert_eq!(parse_duration("30").unwrap(), Duration::from_secs(30));
    }

    #[test]
    fn invalid_durations_are_rejected() {
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("-1s").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn defaults_without_sources() {
        let (_dir, path) = write_config("");
        let settings = Settings::load_with_env(Some(&path), env(&[])).unwrap();

        assert_eq!(settings.period, Duration::from_secs(10));
        assert!(settings.tables.is_empty());
        assert_eq!(settings.probe, PathBuf::from("awkscript.sh"));
        assert_eq!(settings.probe_timeout, None);
        assert_eq!(settings.failure_backoff, Duration::from_millis(500));
        assert_eq!(settings.output, OutputSettings::Stdout);
    }

    #[test]
    fn test_load_from_file() {
        let (_dir, path) = write_config(
            r#"
period = "1s"
tables = ["keyspace1.users", "keyspace1.orders"]
probe = "/opt/probe.sh"
probe_timeout = "30s"
failure_backoff = "2s"

[output]
type = "file"
path = "/var/log/tablestats.ndjson"
"#,
        );

        let settings = Settings::load_with_env(Some(&path), env(&[])).unwrap();

        assert_eq!(settings.period, Duration::from_secs(1));
        assert_eq!(settings.tables, vec!["keyspace1.users", "keyspace1.orders"]);
        assert_eq!(settings.probe, PathBuf::from("/opt/probe.sh"));
        assert_eq!(settings.probe_timeout, Some(Duration::from_secs(30)));
        assert_eq!(settings.failure_backoff, Duration::from_secs(2));
        assert_eq!(
            settings.output,
            OutputSettings::File {
                path: PathBuf::from("/var/log/tablestats.ndjson")
            }
        );
    }

    #[test]
    fn environment_overrides_file() {
        let (_dir, path) = write_config(
            r#"
period = "1s"
tables = ["users"]
"#,
        );

        let settings = Settings::load_with_env(
            Some(&path),
            env(&[
                ("TABLEWATCH_PERIOD", "5s"),
                ("TABLEWATCH_TABLES", "orders,sessions"),
                ("TABLEWATCH_OUTPUT__TYPE", "tcp"),
                ("TABLEWATCH_OUTPUT__ADDR", "127.0.0.1:5044"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.period, Duration::from_secs(5));
        assert_eq!(settings.tables, vec!["orders", "sessions"]);
        assert_eq!(
            settings.output,
            OutputSettings::Tcp {
                addr: "127.0.0.1:5044".to_string()
            }
        );
    }

    #[test]
    fn zero_period_is_rejected() {
        let (_dir, path) = write_config("period = \"0s\"\n");
        let err = Settings::load_with_env(Some(&path), env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "period", .. }));
    }

    #[test]
    fn bad_duration_is_load_error() {
        let (_dir, path) = write_config("period = \"whenever\"\n");
        let err = Settings::load_with_env(Some(&path), env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn missing_required_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(Settings::load_with_env(Some(&path), env(&[])).is_err());
    }

    #[test]
    fn empty_tcp_addr_is_rejected() {
        let settings = Settings {
            output: OutputSettings::Tcp {
                addr: " ".to_string(),
            },
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid {
                key: "output.addr",
                ..
            })
        ));
    }

    #[test]
    fn overrides_replace_configured_values() {
        let mut settings = Settings {
            tables: vec!["users".to_string()],
            ..Default::default()
        };
        settings
            .apply_overrides(
                &["orders".to_string(), "sessions".to_string()],
                Some("250ms"),
                Some(Path::new("/opt/probe.sh")),
            )
            .unwrap();

        assert_eq!(settings.tables, vec!["orders", "sessions"]);
        assert_eq!(settings.period, Duration::from_millis(250));
        assert_eq!(settings.probe, PathBuf::from("/opt/probe.sh"));
    }

    #[test]
    fn empty_overrides_keep_loaded_values() {
        let mut settings = Settings {
            tables: vec!["users".to_string()],
            period: Duration::from_secs(3),
            ..Default::default()
        };
        settings.apply_overrides(&[], None, None).unwrap();

        assert_eq!(settings.tables, vec!["users"]);
        assert_eq!(settings.period, Duration::from_secs(3));
        assert_eq!(settings.probe, PathBuf::from(DEFAULT_PROBE));
    }

    #[test]
    fn overrides_are_validated() {
        let mut settings = Settings::default();
        let err = settings.apply_overrides(&[], Some("0s"), None).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "period", .. }));

        let mut settings = Settings::default();
        let err = settings
            .apply_overrides(&[], None, Some(Path::new("")))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "probe", .. }));

        let mut settings = Settings::default();
        let err = settings.apply_overrides(&[], Some("soon"), None).unwrap_err();
        assert!(matches!(err, ConfigError::Duration(_)));
    }

    #[test]
    fn command_probe_carries_timeout() {
        let settings = Settings {
            probe: PathBuf::from("/opt/probe.sh"),
            probe_timeout: Some(Duration::from_secs(3)),
            ..Default::default()
        };
        let probe = settings.command_probe();
        assert_eq!(probe.program(), Path::new("/opt/probe.sh"));
    }
}
