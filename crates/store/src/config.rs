// Store configuration
// Loaded from TOML; picks the backend and where it lives.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::backend::{Backend, JsonFileBackend, MemoryBackend, SqliteBackend};
use crate::error::SettingsError;
use crate::store::{SettingsStore, StoreOptions};

/// Environment variable overriding the default settings directory.
pub const HOME_ENV: &str = "PREFKIT_HOME";

/// Backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Preferences file (default)
    #[default]
    Json,
    /// Embedded SQLite database
    Sqlite,
    /// Nothing survives the process
    Memory,
}

impl BackendKind {
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            BackendKind::Json => Some("json"),
            BackendKind::Sqlite => Some("db"),
            BackendKind::Memory => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Store name; the default file is `<name>.json` / `<name>.db`
    pub name: String,

    pub backend: BackendKind,

    /// Explicit location, overrides the derived default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Persist after every mutation
    pub auto_flush: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "settings".to_string(),
            backend: BackendKind::Json,
            path: None,
            auto_flush: false,
        }
    }
}

impl StoreConfig {
    pub fn from_toml(input: &str) -> Result<Self, SettingsError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| SettingsError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&contents)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.name.is_empty() {
            return Err(SettingsError::Config("name must not be empty".to_string()));
        }
        if self.name.contains(&['/', '\\'][..]) || self.name == "." || self.name == ".." {
            return Err(SettingsError::Config(format!(
                "name '{}' must not contain path separators",
                self.name
            )));
        }
        Ok(())
    }

    /// Directory holding derived store files.
    pub fn default_dir() -> PathBuf {
        if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return PathBuf::from(home);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("prefkit")
    }

    /// Where the store lives, or `None` for the memory backend.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        let ext = self.backend.extension()?;
        Some(
            self.path
                .clone()
                .unwrap_or_else(|| Self::default_dir().join(format!("{}.{}", self.name, ext))),
        )
    }

    pub fn options(&self) -> StoreOptions {
        StoreOptions { auto_flush: self.auto_flush }
    }

    /// Build the configured backend.
    pub fn backend(&self) -> Result<Box<dyn Backend + Send>, SettingsError> {
        self.validate()?;
        let path = self.resolved_path();
        let backend: Box<dyn Backend + Send> = match (self.backend, path) {
            (BackendKind::Json, Some(path)) => Box::new(JsonFileBackend::new(path)),
            (BackendKind::Sqlite, Some(path)) => Box::new(SqliteBackend::open(path)?),
            _ => Box::new(MemoryBackend::new()),
        };
        Ok(backend)
    }

    /// Open a store as configured.
    pub fn open(&self) -> Result<SettingsStore<Box<dyn Backend + Send>>, SettingsError> {
        SettingsStore::with_options(self.backend()?, self.options())
    }
}
