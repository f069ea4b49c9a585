use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use crate::sensing::LoopTiming;

const APP_DIR_NAME: &str = "wifi-whisperer";
const CONFIG_FILE_NAME: &str = "config.json";
const DATABASE_FILE_NAME: &str = "wifi_sessions.sqlite3";
const LOCATIONS_FILE_NAME: &str = "locations.json";

pub const CONFIG_PATH_ENV: &str = "WIFI_WHISPERER_CONFIG";
pub const DATA_DIR_ENV: &str = "WIFI_WHISPERER_DATA_DIR";
pub const BIND_ENV: &str = "WIFI_WHISPERER_BIND";
pub const DEBUG_ENV: &str = "WIFI_WHISPERER_DEBUG";

/// Upper bound for any session history window, in days.
pub const MAX_HISTORY_DAYS: i64 = 3650;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub data_dir: PathBuf,
    pub bind_addr: String,
    pub poll_interval_secs: u64,
    pub error_backoff_secs: u64,
    pub sensor_timeout_secs: u64,
    /// Default window for the session history query.
    pub history_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            bind_addr: "0.0.0.0:5000".into(),
            poll_interval_secs: 5,
            error_backoff_secs: 10,
            sensor_timeout_secs: 10,
            history_days: 30,
        }
    }
}

impl Config {
    /// Defaults, then the JSON config file if present, then environment
    /// overrides.
    pub fn load() -> Result<Self> {
        let data_dir_override = env::var_os(DATA_DIR_ENV).map(PathBuf::from);
        let config_path = env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                data_dir_override
                    .clone()
                    .unwrap_or_else(default_data_dir)
                    .join(CONFIG_FILE_NAME)
            });

        let mut config = Self::from_file(&config_path)?.unwrap_or_default();

        if let Some(data_dir) = data_dir_override {
            config.data_dir = data_dir;
        }
        if let Ok(bind_addr) = env::var(BIND_ENV) {
            config.bind_addr = bind_addr;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would spin the monitor loop or break queries.
    pub fn validate(&self) -> Result<()> {
        for (field, secs) in [
            ("pollIntervalSecs", self.poll_interval_secs),
            ("errorBackoffSecs", self.error_backoff_secs),
            ("sensorTimeoutSecs", self.sensor_timeout_secs),
        ] {
            if secs == 0 {
                bail!("{field} must be at least 1");
            }
        }

        if !(1..=MAX_HISTORY_DAYS).contains(&self.history_days) {
            bail!(
                "historyDays must be between 1 and {MAX_HISTORY_DAYS}, got {}",
                self.history_days
            );
        }

        Ok(())
    }

    /// `Ok(None)` when the file does not exist.
    pub fn from_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        Ok(Some(config))
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE_NAME)
    }

    pub fn locations_path(&self) -> PathBuf {
        self.data_dir.join(LOCATIONS_FILE_NAME)
    }

    pub fn loop_timing(&self) -> LoopTiming {
        LoopTiming {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            error_backoff: Duration::from_secs(self.error_backoff_secs),
            sensor_timeout: Duration::from_secs(self.sensor_timeout_secs),
        }
    }
}

pub fn debug_enabled() -> bool {
    env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_monitor_timing() {
        let config = Config::default();
        assert_eq!(config.loop_timing(), LoopTiming::default());
        assert_eq!(config.history_days, 30);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"bindAddr": "127.0.0.1:8080", "historyDays": 7}"#).unwrap();

        let config = Config::from_file(&path).unwrap().expect("config present");

        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.history_days, 7);
        assert_eq!(config.poll_interval_secs, 5);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::from_file(&dir.path().join("nope.json")).unwrap(), None);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "[").unwrap();
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn zero_intervals_are_rejected() {
        for field in ["pollIntervalSecs", "errorBackoffSecs", "sensorTimeoutSecs"] {
            let config: Config = serde_json::from_str(&format!(r#"{{"{field}": 0}}"#)).unwrap();
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains(field), "{err}");
        }
    }

    #[test]
    fn history_window_must_be_in_range() {
        for days in [0, -3, MAX_HISTORY_DAYS + 1] {
            let config = Config {
                history_days: days,
                ..Config::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("historyDays"), "{err}");
        }

        let config = Config {
            history_days: MAX_HISTORY_DAYS,
            ..Config::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn derived_paths_live_in_data_dir() {
        let config = Config {
            data_dir: PathBuf::from("/tmp/ww"),
            ..Config::default()
        };
        assert_eq!(config.database_path(), PathBuf::from("/tmp/ww/wifi_sessions.sqlite3"));
        assert_eq!(config.locations_path(), PathBuf::from("/tmp/ww/locations.json"));
    }
}
