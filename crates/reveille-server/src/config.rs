//! Daemon configuration, read from `~/.config/reveille/config.toml` unless
//! a path is given on the command line. Every key is optional.

use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use anyhow::{anyhow, Context};
use chrono_tz::Tz;
use serde::Deserialize;

use reveille_app::settings::AlarmSettings;
use reveille_core::schedule::{DEFAULT_LOOK_AHEAD_MINUTES, DEFAULT_SNOOZE_MINUTES};

const DEFAULT_LOG_FILTER: &str = "info,sqlx=warn";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database_url: String,
    /// IANA name, e.g. `Europe/Zurich`.
    pub timezone: String,
    pub look_ahead_minutes: i64,
    pub snooze_minutes: i64,
    /// How often the daemon re-runs reconciliation to retry failures.
    pub reconcile_interval_minutes: u64,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            timezone: "UTC".into(),
            look_ahead_minutes: DEFAULT_LOOK_AHEAD_MINUTES,
            snooze_minutes: DEFAULT_SNOOZE_MINUTES,
            reconcile_interval_minutes: 60,
            log_filter: DEFAULT_LOG_FILTER.into(),
        }
    }
}

fn default_database_url() -> String {
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reveille")
        .join("reveille.db");
    format!("sqlite://{}", path.display())
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("reveille").join("config.toml"))
    }

    /// An explicit path must exist; the default location may be absent.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn timezone(&self) -> anyhow::Result<Tz> {
        self.timezone
            .parse()
            .map_err(|e| anyhow!("invalid timezone {:?}: {e}", self.timezone))
    }

    pub fn settings(&self) -> anyhow::Result<AlarmSettings> {
        Ok(AlarmSettings::new(self.timezone()?)
            .with_look_ahead_minutes(self.look_ahead_minutes)
            .with_snooze_minutes(self.snooze_minutes))
    }

    /// Period of the retry pass; at least one minute.
    pub fn reconcile_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.reconcile_interval_minutes.max(1).saturating_mul(60))
    }

    /// File backing the database, if the url points at one.
    pub fn database_path(&self) -> Option<PathBuf> {
        let rest = self.database_url.strip_prefix("sqlite:")?;
        let rest = rest.trim_start_matches("//");
        let path = rest.split('?').next().unwrap_or(rest);
        if path.is_empty() || path == ":memory:" {
            return None;
        }
        Some(PathBuf::from(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::io::Write;

    fn write(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let file = write("timezone = \"Europe/Zurich\"\n");
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.timezone, "Europe/Zurich");
        assert_eq!(config.look_ahead_minutes, 5);
        assert_eq!(config.snooze_minutes, 9);
        assert_eq!(config.log_filter, "info,sqlx=warn");
    }

    #[test]
    fn settings_follow_config() {
        let file = write(
            r#"
database_url = "sqlite::memory:"
timezone = "America/New_York"
look_ahead_minutes = 10
snooze_minutes = 5
"#,
        );
        let settings = Config::from_file(file.path()).unwrap().settings().unwrap();
        assert_eq!(settings.timezone, chrono_tz::America::New_York);
        assert_eq!(settings.look_ahead, Duration::minutes(10));
        assert_eq!(settings.snooze, Duration::minutes(5));
    }

    #[test]
    fn unknown_timezone_is_an_error() {
        let config = Config {
            timezone: "Mars/Olympus".into(),
            ..Config::default()
        };
        assert!(config.settings().is_err());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let file = write("snoze_minutes = 3\n");
        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn reconcile_interval_is_clamped() {
        let zero = Config {
            reconcile_interval_minutes: 0,
            ..Config::default()
        };
        assert_eq!(zero.reconcile_interval(), StdDuration::from_secs(60));

        let huge = Config {
            reconcile_interval_minutes: u64::MAX,
            ..Config::default()
        };
        assert_eq!(huge.reconcile_interval(), StdDuration::from_secs(u64::MAX));

        assert_eq!(
            Config::default().reconcile_interval(),
            StdDuration::from_secs(3600)
        );
    }

    #[test]
    fn database_path_is_extracted_from_url() {
        let config = Config {
            database_url: "sqlite:///var/lib/reveille/alarms.db?mode=rwc".into(),
            ..Config::default()
        };
        assert_eq!(
            config.database_path(),
            Some(PathBuf::from("/var/lib/reveille/alarms.db"))
        );

        let memory = Config {
            database_url: "sqlite::memory:".into(),
            ..Config::default()
        };
        assert_eq!(memory.database_path(), None);
    }
}
