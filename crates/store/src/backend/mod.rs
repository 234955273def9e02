// Persistence backends
//
// The store keeps the authoritative copy in memory and hands the backend a full
// snapshot on flush. Backends never see partial updates.

mod json_file;
mod memory;
mod sqlite;

use std::collections::BTreeMap;

pub use json_file::JsonFileBackend;
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use crate::error::SettingsError;
use crate::value::Value;

/// Key to value mapping as persisted.
pub type Entries = BTreeMap<String, Value>;

/// Durable storage for a settings snapshot.
pub trait Backend {
    /// Read every persisted entry. A store that was never written loads empty.
    fn load(&mut self) -> Result<Entries, SettingsError>;

    /// Replace the persisted entries with `entries`.
    ///
    /// Must be all-or-nothing: on error the previously persisted snapshot
    /// stays readable.
    fn persist(&mut self, entries: &Entries) -> Result<(), SettingsError>;

    /// Short human-readable location, used in log lines.
    fn describe(&self) -> String;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn load(&mut self) -> Result<Entries, SettingsError> {
        (**self).load()
    }

    fn persist(&mut self, entries: &Entries) -> Result<(), SettingsError> {
        (**self).persist(entries)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
