// Typed key-value settings store
//
// A `SettingsStore` keeps boolean, number and string values under string keys
// and persists them through a pluggable `Backend` (memory, JSON file, SQLite).

pub mod backend;
pub mod bridge;
pub mod config;
pub mod error;
pub mod store;
pub mod value;

pub use backend::{Backend, Entries, JsonFileBackend, MemoryBackend, SqliteBackend};
pub use bridge::Bridge;
pub use config::{BackendKind, StoreConfig};
pub use error::SettingsError;
pub use store::{SettingsStore, StoreOptions};
pub use value::{Value, ValueKind};

/// On-disk format version shared by the file and database backends.
/// Increment when the persisted layout changes in a way old readers can't handle.
pub const FORMAT_VERSION: u32 = 1;
