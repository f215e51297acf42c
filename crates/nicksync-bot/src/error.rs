//! Error types for the nicksync bot.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for bot operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration file problems. All of them stop the process before startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist
    #[error("failed to open the configuration file '{}'", .0.display())]
    NotFound(PathBuf),

    /// The configuration file could not be read
    #[error("failed to read the configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed TOML or a missing required key
    #[error("failed to read the configuration value: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is present but unusable
    #[error("invalid configuration value '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Errors that can occur in the bot.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection error
    #[error("failed to connect to the database: {0}")]
    Database(#[from] sqlx::Error),

    /// Discord client error
    #[error("Discord error: {0}")]
    Discord(#[from] serenity::Error),
}

impl Error {
    /// Whether this error stops the process before the sync loops start.
    ///
    /// Startup-fatal errors exit with status 1; everything else is a normal
    /// (logged) shutdown.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Database(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_and_database_errors_are_startup_fatal() {
        let missing = Error::from(ConfigError::NotFound(PathBuf::from("./config.toml")));
        assert!(missing.is_startup_fatal());

        let db = Error::from(sqlx::Error::PoolTimedOut);
        assert!(db.is_startup_fatal());

        let discord = Error::from(serenity::Error::Io(std::io::Error::from(
            std::io::ErrorKind::ConnectionReset,
        )));
        assert!(!discord.is_startup_fatal());
    }

    #[test]
    fn not_found_names_the_path() {
        let err = ConfigError::NotFound(PathBuf::from("/etc/nicksync.toml"));
        assert_eq!(
            err.to_string(),
            "failed to open the configuration file '/etc/nicksync.toml'"
        );
    }
}
