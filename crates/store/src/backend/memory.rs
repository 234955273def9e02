use std::sync::Arc;

use parking_lot::Mutex;

use super::{Backend, Entries};
use crate::error::SettingsError;

#[derive(Debug, Default)]
struct Shared {
    entries: Entries,
    fail_writes: bool,
    persist_count: usize,
}

/// In-process backend.
///
/// Clones share the same storage, so opening a second store on a clone
/// behaves like a fresh process reading the same persisted settings.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already-persisted snapshot.
    pub fn with_entries(entries: Entries) -> Self {
        let backend = Self::new();
        backend.shared.lock().entries = entries;
        backend
    }

    /// Make subsequent `persist` calls fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.lock().fail_writes = fail;
    }

    /// Copy of what is currently persisted.
    pub fn snapshot(&self) -> Entries {
        self.shared.lock().entries.clone()
    }

    /// Number of successful `persist` calls so far.
    pub fn persist_count(&self) -> usize {
        self.shared.lock().persist_count
    }
}

impl Backend for MemoryBackend {
    fn load(&mut self) -> Result<Entries, SettingsError> {
        Ok(self.shared.lock().entries.clone())
    }

    fn persist(&mut self, entries: &Entries) -> Result<(), SettingsError> {
        let mut shared = self.shared.lock();
        if shared.fail_writes {
            return Err(SettingsError::Io("memory backend is read-only".to_string()));
        }
        shared.entries = entries.clone();
        shared.persist_count += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
