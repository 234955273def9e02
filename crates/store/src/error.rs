use std::fmt;

use crate::value::ValueKind;

/// Error type for settings operations.
#[derive(Debug)]
pub enum SettingsError {
    /// Key is missing, empty or not a string.
    InvalidKey(String),
    /// Value handed to a typed accessor has another type.
    TypeMismatch { key: String, expected: ValueKind, found: String },
    /// NaN or infinity passed to a number accessor.
    NonFinite { key: String, value: f64 },
    /// File I/O error (read, write, rename).
    Io(String),
    /// Persisted data could not be decoded.
    Format(String),
    /// SQLite error.
    Database(String),
    /// Bad store configuration.
    Config(String),
}

impl SettingsError {
    /// True for errors caused by the caller's arguments rather than storage.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::InvalidKey(_) | Self::TypeMismatch { .. } | Self::NonFinite { .. }
        )
    }

    /// True for errors raised by the persistence layer.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Format(_) | Self::Database(_))
    }
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKey(msg) => write!(f, "invalid key: {msg}"),
            Self::TypeMismatch { key, expected, found } => {
                write!(f, "invalid value for '{key}': expected {expected}, got {found}")
            }
            Self::NonFinite { key, value } => {
                write!(f, "invalid value for '{key}': {value} is not a finite number")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Format(msg) => write!(f, "format error: {msg}"),
            Self::Database(msg) => write!(f, "database error: {msg}"),
            Self::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for SettingsError {}

impl From<std::io::Error> for SettingsError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(e: serde_json::Error) -> Self {
        Self::Format(e.to_string())
    }
}

impl From<rusqlite::Error> for SettingsError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<toml::de::Error> for SettingsError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}
