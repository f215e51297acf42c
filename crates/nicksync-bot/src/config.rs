//! Bot configuration.
//!
//! Loaded from a flat TOML file:
//!
//! ```toml
//! bot_email = "bot@example.com"
//! bot_password = "discord-bot-token"
//! db_host = "localhost"
//! db_username = "auth"
//! db_password = "secret"
//! db_database = "alliance_auth"
//! api_command_delay = 1.5
//! ```
//!
//! `db_port`, `db_max_connections` and `sweep_interval` are optional.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "./config.toml";

fn default_db_port() -> u16 {
    3306
}

fn default_db_max_connections() -> u32 {
    1
}

fn default_sweep_interval() -> f64 {
    nicksync_core::DEFAULT_SWEEP_INTERVAL.as_secs_f64()
}

/// Configuration for the bot process.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Bot account label
    pub bot_email: String,

    /// Bot credential (the Discord bot token)
    pub bot_password: String,

    /// Database host
    pub db_host: String,

    /// Database port
    #[serde(default = "default_db_port")]
    pub db_port: u16,

    /// Database user
    pub db_username: String,

    /// Database password
    pub db_password: String,

    /// Database (schema) name
    pub db_database: String,

    /// Upper bound on open database connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// Seconds to wait after each dispatched command
    pub api_command_delay: f64,

    /// Seconds between full membership sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: f64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bot_email", &self.bot_email)
            .field("bot_password", &"<redacted>")
            .field("db_host", &self.db_host)
            .field("db_port", &self.db_port)
            .field("db_username", &self.db_username)
            .field("db_password", &"<redacted>")
            .field("db_database", &self.db_database)
            .field("db_max_connections", &self.db_max_connections)
            .field("api_command_delay", &self.api_command_delay)
            .field("sweep_interval", &self.sweep_interval)
            .finish()
    }
}

impl Config {
    /// Load and validate the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        contents.parse()
    }

    /// Check values that parse but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        seconds("api_command_delay", self.api_command_delay)?;

        if seconds("sweep_interval", self.sweep_interval)?.is_zero() {
            return Err(ConfigError::Invalid {
                key: "sweep_interval",
                reason: format!("expected a positive number of seconds, got {}", self.sweep_interval),
            });
        }

        if self.db_max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "db_max_connections",
                reason: "at least one connection is required".to_string(),
            });
        }

        if self.bot_password.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "bot_password",
                reason: "must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Spacing between dispatched commands.
    pub fn command_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.api_command_delay).unwrap_or_default()
    }

    /// Time between full membership sweeps.
    pub fn sweep_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.sweep_interval)
            .ok()
            .filter(|interval| !interval.is_zero())
            .unwrap_or(nicksync_core::DEFAULT_SWEEP_INTERVAL)
    }
}

/// Convert a seconds value, rejecting negative, non-finite and out-of-range input.
fn seconds(key: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|e| ConfigError::Invalid {
        key,
        reason: format!("expected a non-negative number of seconds, got {} ({})", value, e),
    })
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    const FULL: &str = r#"
bot_email = "bot@example.com"
bot_password = "token"
db_host = "db.internal"
db_username = "auth"
db_password = "hunter2"
db_database = "alliance_auth"
api_command_delay = 1.5
"#;

    #[test]
    fn load_full_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(FULL.as_bytes())
            .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.db_host, "db.internal");
        assert_eq!(config.db_port, 3306);
        assert_eq!(config.db_max_connections, 1);
        assert_eq!(config.command_delay(), Duration::from_millis(1500));
        assert_eq!(config.sweep_interval(), Duration::from_secs(300));
    }

    #[test]
    fn missing_file() {
        let dir = tempdir().unwrap();
        let err = Config::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn missing_required_key() {
        let without_db = FULL.replace("db_database = \"alliance_auth\"\n", "");
        let err = without_db.parse::<Config>().unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("db_database"));
    }

    #[test]
    fn integer_delay_accepted() {
        let config = FULL
            .replace("api_command_delay = 1.5", "api_command_delay = 2")
            .parse::<Config>()
            .unwrap();
        assert_eq!(config.command_delay(), Duration::from_secs(2));
    }

    #[test]
    fn negative_delay_rejected() {
        let err = FULL
            .replace("api_command_delay = 1.5", "api_command_delay = -1.0")
            .parse::<Config>()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "api_command_delay",
                ..
            }
        ));
    }

    #[test]
    fn delay_too_large_for_a_duration_rejected() {
        let err = FULL
            .replace("api_command_delay = 1.5", "api_command_delay = 1e20")
            .parse::<Config>()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "api_command_delay",
                ..
            }
        ));
    }

    #[test]
    fn sweep_interval_rounding_to_zero_rejected() {
        for value in ["1e-12", "0.0"] {
            let err = format!("{}sweep_interval = {}\n", FULL, value)
                .parse::<Config>()
                .unwrap_err();
            assert!(matches!(
                err,
                ConfigError::Invalid {
                    key: "sweep_interval",
                    ..
                }
            ));
        }
    }

    #[test]
    fn optional_keys_override_defaults() {
        let config = format!("{}db_port = 3307\nsweep_interval = 60\ndb_max_connections = 4\n", FULL)
            .parse::<Config>()
            .unwrap();
        assert_eq!(config.db_port, 3307);
        assert_eq!(config.db_max_connections, 4);
        assert_eq!(config.sweep_interval(), Duration::from_secs(60));
    }

    #[test]
    fn debug_redacts_secrets() {
        let config: Config = FULL.parse().unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("\"token\""));
        assert!(rendered.contains("db.internal"));
    }
}
