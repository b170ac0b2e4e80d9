//! # File-only tracing setup
//!
//! The TUI owns stdout, so logs go exclusively to a daily rolling file
//! (JSON lines) under the app's log directory. [`LoggerBuilder::build`]
//! installs the global subscriber and hands back the [`WorkerGuard`];
//! `main` keeps the guard alive for the process lifetime or buffered
//! records are lost on exit.

use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, Layer, filter::Directive, layer::SubscriberExt, util::SubscriberInitExt,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub log_dir: PathBuf,
    pub log_file_prefix: CompactString,
    pub log_level: CompactString,
    pub max_log_files: usize,
    pub rotation: LogRotation,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Never,
    Daily,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs"),
            log_file_prefix: CompactString::const_new("rbm"),
            log_level: CompactString::const_new("info"),
            max_log_files: 10,
            rotation: LogRotation::Daily,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("logger already initialized")]
    AlreadyInitialized,

    #[error("invalid log directory: {0}")]
    InvalidLogDirectory(String),

    #[error("failed to create log directory: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    #[error("failed to create file appender: {0}")]
    Appender(String),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

pub struct LoggerBuilder {
    config: LoggerConfig,
}

impl LoggerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: LoggerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: LoggerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: &str) -> Self {
        self.config.log_level = CompactString::new(level);
        self
    }

    #[must_use]
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    /// Install the global subscriber. Call once; a second call fails with
    /// [`LoggingError::AlreadyInitialized`].
    pub fn build(self) -> Result<WorkerGuard, LoggingError> {
        validate_config(&self.config)?;

        if !self.config.log_dir.exists() {
            std::fs::create_dir_all(&self.config.log_dir)?;
        }

        let rotation = match self.config.rotation {
            LogRotation::Never => Rotation::NEVER,
            LogRotation::Daily => Rotation::DAILY,
        };

        let file_appender = RollingFileAppender::builder()
            .rotation(rotation)
            .filename_prefix(self.config.log_file_prefix.as_str())
            .filename_suffix("jsonl")
            .max_log_files(self.config.max_log_files)
            .build(&self.config.log_dir)
            .map_err(|e| LoggingError::Appender(e.to_string()))?;

        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let directive = Directive::from_str(&self.config.log_level)
            .map_err(|e| LoggingError::ConfigError(format!("invalid log level: {e}")))?;
        let filter = EnvFilter::from_default_env().add_directive(directive);

        let file_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(non_blocking)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(file_layer)
            .try_init()
            .map_err(|_| LoggingError::AlreadyInitialized)?;

        Ok(guard)
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_config(config: &LoggerConfig) -> Result<(), LoggingError> {
    if config.max_log_files == 0 {
        return Err(LoggingError::ConfigError(
            "max_log_files must be greater than 0".to_string(),
        ));
    }
    validate_log_directory(&config.log_dir)
}

fn validate_log_directory(path: &Path) -> Result<(), LoggingError> {
    if path.components().count() == 0 {
        return Err(LoggingError::InvalidLogDirectory("empty path".to_string()));
    }

    for component in path.components() {
        if component == std::path::Component::ParentDir {
            return Err(LoggingError::InvalidLogDirectory(
                "path contains parent directory references".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_directory_rejects_parent_references() {
        let err = validate_log_directory(Path::new("../logs")).unwrap_err();
        assert!(matches!(err, LoggingError::InvalidLogDirectory(_)));
    }

    #[test]
    fn log_directory_rejects_empty_path() {
        assert!(validate_log_directory(Path::new("")).is_err());
    }

    #[test]
    fn config_rejects_zero_file_cap() {
        let config = LoggerConfig {
            max_log_files: 0,
            ..LoggerConfig::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(LoggingError::ConfigError(_))
        ));
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&LoggerConfig::default()).is_ok());
    }
}
