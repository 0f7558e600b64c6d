use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::error::ConfigError;
use crate::models::ChatId;

#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(ConfigError::Syntax {
                    line: idx + 1,
                    content: line.to_string(),
                });
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Telegram,
    Discord,
    Console,
}

impl FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "telegram" => Ok(RunMode::Telegram),
            "discord" => Ok(RunMode::Discord),
            "console" | "cli" => Ok(RunMode::Console),
            _ => Err(ConfigError::InvalidValue {
                key: "RUN_MODE".to_string(),
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunMode::Telegram => "telegram",
            RunMode::Discord => "discord",
            RunMode::Console => "console",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub run_mode: RunMode,
    pub data_dir: PathBuf,
    pub timezone: Tz,
    pub admin_password: Option<String>,
    pub telegram_token: Option<String>,
    pub discord_token: Option<String>,
    pub console_chat_id: ChatId,
    pub sweep_interval: Duration,
    pub reminder_interval: Duration,
    pub confirm_timeout: Duration,
    pub delivery_timeout: Duration,
    pub telegram_poll_timeout: u64,
}

impl Settings {
    /// Builds settings from a key lookup, usually the config file with the
    /// process environment as fallback.
    pub fn resolve<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        let run_mode = match lookup("RUN_MODE") {
            Some(mode) => mode.parse()?,
            None => RunMode::Console,
        };
        let timezone = match lookup("TIMEZONE") {
            Some(name) => name.parse::<Tz>().map_err(|_| ConfigError::InvalidValue {
                key: "TIMEZONE".to_string(),
                value: name,
            })?,
            None => chrono_tz::Asia::Seoul,
        };
        Ok(Self {
            run_mode,
            data_dir: PathBuf::from(lookup("DATA_DIR").unwrap_or_else(|| "./data".to_string())),
            timezone,
            admin_password: lookup("ADMIN_PASSWORD"),
            telegram_token: lookup("TELEGRAM_BOT_TOKEN"),
            discord_token: lookup("DISCORD_BOT_TOKEN"),
            console_chat_id: number(&lookup, "CONSOLE_CHAT_ID", 1)?,
            sweep_interval: seconds(&lookup, "SWEEP_INTERVAL_SECS", 60)?,
            reminder_interval: seconds(&lookup, "REMINDER_INTERVAL_SECS", 60)?,
            confirm_timeout: seconds(&lookup, "CONFIRM_TIMEOUT_SECS", 30)?,
            delivery_timeout: seconds(&lookup, "DELIVERY_TIMEOUT_SECS", 10)?,
            telegram_poll_timeout: number(&lookup, "TELEGRAM_POLL_TIMEOUT_SECS", 30)?,
        })
    }

    pub fn telegram_token(&self) -> Result<&str, ConfigError> {
        self.telegram_token
            .as_deref()
            .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))
    }

    pub fn discord_token(&self) -> Result<&str, ConfigError> {
        self.discord_token
            .as_deref()
            .ok_or(ConfigError::Missing("DISCORD_BOT_TOKEN"))
    }
}

fn number<T, F>(get: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
    }
}

fn seconds<F>(get: &F, key: &str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs: u64 = number(get, key, default)?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: "0".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parses_exports_quotes_and_comments() {
        let config = AppConfig::parse(
            "# bot settings\nexport RUN_MODE=telegram\nADMIN_PASSWORD=\"s3cret\"\n\nTIMEZONE='Europe/Berlin'\n",
        )
        .unwrap();
        assert_eq!(config.get("RUN_MODE").as_deref(), Some("telegram"));
        assert_eq!(config.get("ADMIN_PASSWORD").as_deref(), Some("s3cret"));
        assert_eq!(config.get("TIMEZONE").as_deref(), Some("Europe/Berlin"));
        assert!(config.get("DATA_DIR").is_none());
    }

    #[test]
    fn rejects_lines_without_assignment() {
        let err = AppConfig::parse("RUN_MODE=console\nnot a pair\n").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { line: 2, .. }));
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings = Settings::resolve(lookup(&[])).unwrap();
        assert_eq!(settings.run_mode, RunMode::Console);
        assert_eq!(settings.timezone, chrono_tz::Asia::Seoul);
        assert_eq!(settings.data_dir, PathBuf::from("./data"));
        assert_eq!(settings.confirm_timeout, Duration::from_secs(30));
        assert_eq!(settings.delivery_timeout, Duration::from_secs(10));
        assert_eq!(settings.sweep_interval, Duration::from_secs(60));
        assert!(settings.admin_password.is_none());
        assert!(matches!(
            settings.telegram_token(),
            Err(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))
        ));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let settings = Settings::resolve(lookup(&[
            ("RUN_MODE", "Discord"),
            ("TIMEZONE", "UTC"),
            ("REMINDER_INTERVAL_SECS", "15"),
            ("DISCORD_BOT_TOKEN", "abc"),
        ]))
        .unwrap();
        assert_eq!(settings.run_mode, RunMode::Discord);
        assert_eq!(settings.timezone, chrono_tz::UTC);
        assert_eq!(settings.reminder_interval, Duration::from_secs(15));
        assert_eq!(settings.discord_token().unwrap(), "abc");
    }

    #[test]
    fn invalid_values_are_reported_by_key() {
        let err = Settings::resolve(lookup(&[("TIMEZONE", "Mars/Olympus")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "TIMEZONE"));

        let err = Settings::resolve(lookup(&[("SWEEP_INTERVAL_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "SWEEP_INTERVAL_SECS"));

        let err = Settings::resolve(lookup(&[("DELIVERY_TIMEOUT_SECS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        assert!("pager".parse::<RunMode>().is_err());
    }
}
