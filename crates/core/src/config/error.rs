//! Error types for configuration loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading `apkforge.toml`.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file exists but cannot be read.
    #[error("failed to read config file at {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for the expected schema.
    #[error("failed to parse TOML file at {path}: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Type alias for Result with ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;
