//! Runtime configuration loaded from `roster.toml`.
//!
//! # Responsibility
//! - Parse and validate the knobs record services honour.
//! - Provide a commented default file for operators.
//!
//! # Invariants
//! - Every field has a default; an empty file is a valid config.
//! - `counter_max_attempts` is at least 1 after validation.

use crate::pagination::CursorOrdering;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Config file name looked up next to the database.
pub const CONFIG_FILE_NAME: &str = "roster.toml";
const DEFAULT_DATABASE_FILE: &str = "roster.sqlite3";
const DEFAULT_COUNTER_MAX_ATTEMPTS: u32 = 64;

/// What record creation does when the allocated id already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateIdPolicy {
    /// Replace the existing document.
    #[default]
    LastWriteWins,
    /// Fail the create with `DuplicateId`.
    Reject,
}

/// Logging section of `roster.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    #[serde(default = "default_log_level_string")]
    pub level: String,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Rotate the active file once it reaches this size.
    #[serde(default = "default_max_file_mb")]
    pub max_file_mb: u64,
    /// Rotated files kept on disk.
    #[serde(default = "default_keep_files")]
    pub keep_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level_string(),
            dir: None,
            max_file_mb: default_max_file_mb(),
            keep_files: default_keep_files(),
        }
    }
}

fn default_log_level_string() -> String {
    crate::logging::default_log_level().to_string()
}

fn default_max_file_mb() -> u64 {
    10
}

fn default_keep_files() -> usize {
    5
}

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterConfig {
    /// SQLite database file, relative paths resolve against the config file.
    #[serde(default = "default_database")]
    pub database: PathBuf,
    #[serde(default)]
    pub duplicate_id_policy: DuplicateIdPolicy,
    /// Compare-and-set attempts per counter claim.
    #[serde(default = "default_counter_max_attempts")]
    pub counter_max_attempts: u32,
    #[serde(default)]
    pub teacher_cursor_ordering: CursorOrdering,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_database() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE_FILE)
}

fn default_counter_max_attempts() -> u32 {
    DEFAULT_COUNTER_MAX_ATTEMPTS
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            duplicate_id_policy: DuplicateIdPolicy::default(),
            counter_max_attempts: default_counter_max_attempts(),
            teacher_cursor_ordering: CursorOrdering::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Config loading failure.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        message: String,
    },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to access config `{}`: {source}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "failed to parse config `{}`: {message}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl RosterConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Roster configuration

# SQLite database file. Relative paths resolve against this file's directory.
database = "roster.sqlite3"

# What to do when a newly allocated record id already exists:
#   "last_write_wins" = replace the stored record (default)
#   "reject"          = fail the create with a duplicate-id error
duplicate_id_policy = "last_write_wins"

# Compare-and-set attempts per counter claim before giving up.
counter_max_attempts = 64

# Teacher cursor paging sort keys:
#   "consistent" = anchor and page both sorted by last_name (default)
#   "split"      = anchor by first_name, page by last_name
teacher_cursor_ordering = "consistent"

[logging]
level = "info"
# dir = "/var/log/roster"
max_file_mb = 10
keep_files = 5
"#
    }

    /// Reads, parses and validates a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content).map_err(|err| match err {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        if config.database.is_relative() {
            if let Some(parent) = path.parent() {
                config.database = parent.join(&config.database);
            }
        }
        Ok(config)
    }

    /// Parses and validates config text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse {
            path: PathBuf::new(),
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Ok(());
        }
        std::fs::write(path, Self::default_toml()).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.counter_max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "counter_max_attempts must be at least 1".to_string(),
            ));
        }
        if let Some(dir) = self.logging.dir.as_deref() {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "logging.dir must be absolute, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, DuplicateIdPolicy, RosterConfig, CONFIG_FILE_NAME};
    use crate::pagination::CursorOrdering;
    use tempfile::TempDir;

    #[test]
    fn empty_file_uses_defaults() {
        let config = RosterConfig::from_toml_str("").unwrap();
        assert_eq!(config, RosterConfig::default());
        assert_eq!(config.duplicate_id_policy, DuplicateIdPolicy::LastWriteWins);
        assert_eq!(config.teacher_cursor_ordering, CursorOrdering::Consistent);
    }

    #[test]
    fn default_toml_parses() {
        let config = RosterConfig::from_toml_str(RosterConfig::default_toml()).unwrap();
        assert_eq!(config.counter_max_attempts, 64);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.dir.is_none());
    }

    #[test]
    fn parses_non_default_policies() {
        let config = RosterConfig::from_toml_str(
            "duplicate_id_policy = \"reject\"\nteacher_cursor_ordering = \"split\"\n",
        )
        .unwrap();
        assert_eq!(config.duplicate_id_policy, DuplicateIdPolicy::Reject);
        assert_eq!(config.teacher_cursor_ordering, CursorOrdering::Split);
    }

    #[test]
    fn rejects_unknown_policy_and_zero_attempts() {
        assert!(matches!(
            RosterConfig::from_toml_str("duplicate_id_policy = \"first_wins\""),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            RosterConfig::from_toml_str("counter_max_attempts = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn relative_database_resolves_against_config_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        RosterConfig::write_default_if_missing(&path).unwrap();

        let config = RosterConfig::from_file(&path).unwrap();
        assert_eq!(config.database, dir.path().join("roster.sqlite3"));
    }

    #[test]
    fn write_default_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "counter_max_attempts = 3\n").unwrap();

        RosterConfig::write_default_if_missing(&path).unwrap();

        let config = RosterConfig::from_file(&path).unwrap();
        assert_eq!(config.counter_max_attempts, 3);
    }
}
