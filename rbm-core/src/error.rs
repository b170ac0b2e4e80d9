//! # Unified application error type
//!
//! Everything above the `restic-client` boundary reports failures through
//! [`AppError`]. Background tasks never surface these directly; they fold
//! them into messages so the event loop stays alive, and `main` wraps the
//! remainder in `anyhow` context at the process boundary.

use std::{io, path::PathBuf};

use restic_client::ResticError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Standard IO error, auto-converted from `io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TOML config parsing error.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// TOML config encoding error.
    #[error("config encode error: {0}")]
    ConfigEncode(#[from] toml::ser::Error),

    /// Config file I/O error with path.
    #[error("failed to access config file {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A configuration value that fails validation. Raised before any
    /// subprocess is spawned.
    #[error("invalid configuration: {field}: {message}")]
    InvalidConfig { field: String, message: String },

    /// The platform config directory could not be resolved.
    #[error("could not determine a config directory for this platform")]
    NoConfigDir,

    /// Failure from the restic driver layer.
    #[error(transparent)]
    Restic(#[from] ResticError),

    /// Terminal I/O or rendering error.
    #[error("terminal error: {0}")]
    Terminal(String),
}

impl AppError {
    /// Create a config validation error.
    pub fn invalid_config<S1: Into<String>, S2: Into<String>>(field: S1, message: S2) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }
}
