use anyhow::Result;
use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Used by `add` when no start time is given.
    pub default_start_time: NaiveTime,
    pub default_end_time: NaiveTime,
    /// How many months `calendar` shows when `--months` is omitted.
    pub months_ahead: usize,
    pub week_start: Weekday,
    /// Queue reminders in the outbox. When off they are only logged.
    pub notifications: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            default_end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            months_ahead: 6,
            week_start: Weekday::Mon,
            notifications: true,
        }
    }
}

pub fn load_config(base_dir: &Path) -> Result<Config> {
    let path = base_dir.join("config.json");

    if !path.exists() {
        let config = Config::default();
        let data = serde_json::to_string_pretty(&config)?;
        fs::write(&path, data)?;
        return Ok(config);
    }

    let data = fs::read_to_string(&path)?;
    let config = serde_json::from_str(&data)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_config_writes_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = load_config(dir.path())?;

        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.json").exists());
        assert_eq!(load_config(dir.path())?, config);
        Ok(())
    }

    #[test]
    fn test_load_config_partial_file() -> Result<()> {
        let dir = tempdir()?;
        fs::write(
            dir.path().join("config.json"),
            r#"{ "months_ahead": 3, "week_start": "Sun" }"#,
        )?;

        let config = load_config(dir.path())?;
        assert_eq!(config.months_ahead, 3);
        assert_eq!(config.week_start, Weekday::Sun);
        assert_eq!(config.default_start_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert!(config.notifications);
        Ok(())
    }
}
