//! Typed settings store.
//!
//! [`SettingsStore`] owns the in-memory entries and a [`Backend`]. Reads never
//! touch the backend; writes mark the store dirty until [`SettingsStore::flush`]
//! hands the backend a snapshot.
//!
//! Reading a key through an accessor of another kind (e.g. `get_boolean` on a
//! string entry) treats the key as absent for that accessor.

use crate::backend::{Backend, Entries, MemoryBackend};
use crate::error::SettingsError;
use crate::value::{check_finite, validate_key, Value, ValueKind};

/// Store behavior knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    /// Persist after every successful mutation instead of waiting for `flush`.
    pub auto_flush: bool,
}

pub struct SettingsStore<B: Backend = MemoryBackend> {
    entries: Entries,
    backend: B,
    dirty: bool,
    options: StoreOptions,
}

impl SettingsStore<MemoryBackend> {
    /// Fresh store on a private memory backend.
    pub fn in_memory() -> Self {
        Self {
            entries: Entries::new(),
            backend: MemoryBackend::new(),
            dirty: false,
            options: StoreOptions::default(),
        }
    }
}

impl<B: Backend> SettingsStore<B> {
    /// Open a store, loading whatever the backend has persisted.
    pub fn open(backend: B) -> Result<Self, SettingsError> {
        Self::with_options(backend, StoreOptions::default())
    }

    pub fn with_options(mut backend: B, options: StoreOptions) -> Result<Self, SettingsError> {
        let entries = backend.load()?;
        log::debug!("Loaded {} setting(s) from {}", entries.len(), backend.describe());
        Ok(Self { entries, backend, dirty: false, options })
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    pub fn set_boolean(&mut self, key: &str, value: bool) -> Result<(), SettingsError> {
        self.set(key, Value::Boolean(value))
    }

    /// Rejects NaN and infinities.
    pub fn set_number(&mut self, key: &str, value: f64) -> Result<(), SettingsError> {
        self.set(key, Value::Number(value))
    }

    pub fn set_string(&mut self, key: &str, value: impl Into<String>) -> Result<(), SettingsError> {
        self.set(key, Value::String(value.into()))
    }

    /// Create or overwrite `key`. The entry takes the value's type-tag.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        validate_key(key)?;
        if let Value::Number(n) = value {
            check_finite(key, n)?;
        }
        self.entries.insert(key.to_string(), value);
        self.mark_dirty();
        Ok(())
    }

    /// Write through the accessor for `kind`; a value of any other kind is
    /// rejected and the entry is left untouched.
    pub fn set_as(&mut self, kind: ValueKind, key: &str, value: Value) -> Result<(), SettingsError> {
        validate_key(key)?;
        if value.kind() != kind {
            return Err(SettingsError::TypeMismatch {
                key: key.to_string(),
                expected: kind,
                found: value.kind().to_string(),
            });
        }
        self.set(key, value)
    }

    /// Delete `key` and its type-tag. Missing keys are not an error.
    pub fn remove(&mut self, key: &str) -> Result<(), SettingsError> {
        validate_key(key)?;
        if self.entries.remove(key).is_some() {
            self.mark_dirty();
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        // Always dirty: the backend may hold entries this instance never loaded
        self.entries.clear();
        self.mark_dirty();
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn kind_of(&self, key: &str) -> Option<ValueKind> {
        self.get(key).map(Value::kind)
    }

    pub fn get_boolean(&self, key: &str) -> Option<bool> {
        self.typed(key, ValueKind::Boolean).and_then(Value::as_bool)
    }

    pub fn get_boolean_or(&self, key: &str, default: bool) -> bool {
        self.get_boolean(key).unwrap_or(default)
    }

    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.typed(key, ValueKind::Number).and_then(Value::as_f64)
    }

    pub fn get_number_or(&self, key: &str, default: f64) -> f64 {
        self.get_number(key).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.typed(key, ValueKind::String).and_then(Value::as_str)
    }

    pub fn get_string_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get_string(key).unwrap_or(default)
    }

    fn typed(&self, key: &str, kind: ValueKind) -> Option<&Value> {
        let value = self.entries.get(key)?;
        if value.kind() != kind {
            log::debug!("Setting '{}' holds a {}, read as {}", key, value.kind(), kind);
            return None;
        }
        Some(value)
    }

    /// Existence check. Empty keys are an argument error, not an absence.
    pub fn has_key(&self, key: &str) -> Result<bool, SettingsError> {
        validate_key(key)?;
        Ok(self.entries.contains_key(key))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// Every stored key, sorted.
    pub fn get_all_keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn entries(&self) -> &Entries {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ------------------------------------------------------------------
    // Durability
    // ------------------------------------------------------------------

    /// True when there are mutations the backend has not seen yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Persist pending changes. Returns false if the backend failed; the
    /// in-memory entries are kept and the next flush retries.
    pub fn flush(&mut self) -> bool {
        match self.try_flush() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to flush settings to {}: {}", self.backend.describe(), e);
                false
            }
        }
    }

    /// Like [`flush`](Self::flush) but reports the backend error.
    pub fn try_flush(&mut self) -> Result<(), SettingsError> {
        if !self.dirty {
            return Ok(());
        }
        self.backend.persist(&self.entries)?;
        self.dirty = false;
        log::debug!("Flushed {} setting(s) to {}", self.entries.len(), self.backend.describe());
        Ok(())
    }

    /// Drop in-memory state (including unflushed changes) and re-read the backend.
    pub fn reload(&mut self) -> Result<(), SettingsError> {
        self.entries = self.backend.load()?;
        self.dirty = false;
        Ok(())
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        if self.options.auto_flush {
            // Failure leaves the store dirty; it is already logged by flush
            self.flush();
        }
    }
}

impl<B: Backend> std::fmt::Debug for SettingsStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore")
            .field("backend", &self.backend.describe())
            .field("entries", &self.entries)
            .field("dirty", &self.dirty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_false_reads_back_false() {
        let mut store = SettingsStore::in_memory();
        store.set_boolean("boolKey", false).unwrap();
        assert_eq!(store.get_boolean("boolKey"), Some(false));

        store.set_boolean("boolKey", true).unwrap();
        assert_eq!(store.get_boolean("boolKey"), Some(true));
        assert!(store.get_boolean_or("boolKey", false));
    }

    #[test]
    fn test_number_precision() {
        let mut store = SettingsStore::in_memory();
        store.set_number("numberKey", 54.321).unwrap();
        let value = store.get_number("numberKey").unwrap();
        assert_eq!(value, 54.321);
        assert_eq!(format!("{:.3}", value), "54.321");
    }

    #[test]
    fn test_non_finite_numbers_rejected() {
        let mut store = SettingsStore::in_memory();
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = store.set_number("numberKey", bad).unwrap_err();
            assert!(err.is_invalid_argument());
        }
        assert!(!store.has_key("numberKey").unwrap());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_defaults_for_missing_keys() {
        let store = SettingsStore::in_memory();
        assert_eq!(store.get_string("noStringKey"), None);
        assert_eq!(store.get_boolean("noBoolKey"), None);
        assert_eq!(store.get_number("noNumberKey"), None);

        assert_eq!(store.get_string_or("noStringKey", "No string value"), "No string value");
        assert!(store.get_boolean_or("noBoolKey", true));
        assert_eq!(store.get_number_or("noNumberKey", 123.45), 123.45);
    }

    #[test]
    fn test_mismatched_read_is_absent() {
        let mut store = SettingsStore::in_memory();
        store.set_string("stringKey", "true").unwrap();

        assert_eq!(store.get_boolean("stringKey"), None);
        assert_eq!(store.get_number("stringKey"), None);
        assert!(!store.get_boolean_or("stringKey", false));
        assert_eq!(store.kind_of("stringKey"), Some(ValueKind::String));
        assert_eq!(store.get_string("stringKey"), Some("true"));
    }

    #[test]
    fn test_overwrite_changes_type_tag() {
        let mut store = SettingsStore::in_memory();
        store.set_number("key", 1.0).unwrap();
        store.set_string("key", "one").unwrap();

        assert_eq!(store.kind_of("key"), Some(ValueKind::String));
        assert_eq!(store.get_number("key"), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_set_as_rejects_other_kinds() {
        let mut store = SettingsStore::in_memory();
        store.set_boolean("boolKey", true).unwrap();

        let err = store
            .set_as(ValueKind::Boolean, "boolKey", Value::String("str".into()))
            .unwrap_err();
        assert!(matches!(err, SettingsError::TypeMismatch { expected: ValueKind::Boolean, .. }));
        assert!(store.set_as(ValueKind::String, "boolKey", Value::Boolean(true)).is_err());
        assert!(store.set_as(ValueKind::Number, "boolKey", Value::String("123".into())).is_err());

        // Previous value untouched
        assert_eq!(store.get_boolean("boolKey"), Some(true));

        store.set_as(ValueKind::Number, "numberKey", Value::Number(22.0)).unwrap();
        assert_eq!(store.get_number("numberKey"), Some(22.0));
    }

    #[test]
    fn test_has_key_remove_clear() {
        let mut store = SettingsStore::in_memory();
        assert!(!store.has_key("boolKey").unwrap());

        store.set_boolean("boolKey", true).unwrap();
        store.set_string("stringKey", "String value").unwrap();
        assert!(store.has_key("boolKey").unwrap());

        store.remove("boolKey").unwrap();
        assert!(!store.has_key("boolKey").unwrap());
        store.remove("boolKey").expect("removing a missing key is a no-op");

        store.clear();
        assert!(!store.has_key("stringKey").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_empty_key_rejected_everywhere() {
        let mut store = SettingsStore::in_memory();
        assert!(store.set_boolean("", true).unwrap_err().is_invalid_argument());
        assert!(store.set_string("", "x").is_err());
        assert!(store.set_number("", 1.0).is_err());
        assert!(store.has_key("").unwrap_err().is_invalid_argument());
        assert!(store.remove("").is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let mut store = SettingsStore::in_memory();
        store.set_string("Key", "upper").unwrap();
        store.set_string("key", "lower").unwrap();

        assert_eq!(store.get_all_keys(), vec!["Key".to_string(), "key".to_string()]);
        assert_eq!(store.get_string("Key"), Some("upper"));
    }

    #[test]
    fn test_flush_without_changes_skips_backend() {
        let backend = MemoryBackend::new();
        let mut store = SettingsStore::open(backend.clone()).unwrap();

        assert!(store.flush());
        assert_eq!(backend.persist_count(), 0);

        store.set_string("stringKey", "String value").unwrap();
        assert!(store.flush());
        assert!(store.flush());
        assert_eq!(backend.persist_count(), 1);
    }

    #[test]
    fn test_remove_missing_key_stays_clean() {
        let mut store = SettingsStore::in_memory();
        store.remove("nothing").unwrap();
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_reload_discards_unflushed_changes() {
        let backend = MemoryBackend::new();
        let mut store = SettingsStore::open(backend.clone()).unwrap();
        store.set_number("kept", 1.0).unwrap();
        assert!(store.flush());

        store.set_number("lost", 2.0).unwrap();
        store.reload().unwrap();

        assert_eq!(store.get_all_keys(), vec!["kept".to_string()]);
        assert!(!store.is_dirty());
    }
}
