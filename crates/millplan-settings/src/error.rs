//! Planner configuration errors

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Cannot read planner config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot write planner config {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No platform config directory, or it could not be created
    #[error("No usable config directory: {0}")]
    NoConfigDirectory(String),

    /// A value failed validation
    #[error("Invalid value for {key}: {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("Malformed JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Cannot encode config as TOML: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Problems with a single key or the file format
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("'{0}' is not a planner setting")]
    UnknownKey(String),

    #[error("Config files must end in .toml or .json: {0}")]
    UnsupportedFormat(String),

    #[error("Cannot parse '{value}' for '{key}'")]
    Unparsable { key: String, value: String },
}

pub type SettingsResult<T> = Result<T, SettingsError>;
