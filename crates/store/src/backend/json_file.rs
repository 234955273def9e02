// Preferences file backend
// One JSON document per store, replaced atomically on persist.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{Backend, Entries};
use crate::error::SettingsError;
use crate::FORMAT_VERSION;

#[derive(Deserialize)]
struct Document {
    version: u32,
    #[serde(default)]
    entries: Entries,
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    version: u32,
    entries: &'a Entries,
}

fn write_synced(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents)?;
    file.write_all(b"\n")?;
    file.sync_all()
}

/// Settings persisted as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Backend for JsonFileBackend {
    fn load(&mut self) -> Result<Entries, SettingsError> {
        if !self.path.exists() {
            return Ok(Entries::new());
        }

        let contents = fs::read_to_string(&self.path)
            .map_err(|e| SettingsError::Io(format!("{}: {}", self.path.display(), e)))?;

        // Strip comments (lines starting with //)
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        if cleaned.trim().is_empty() {
            return Ok(Entries::new());
        }

        let doc: Document = serde_json::from_str(&cleaned)
            .map_err(|e| SettingsError::Format(format!("{}: {}", self.path.display(), e)))?;

        if doc.version != FORMAT_VERSION {
            return Err(SettingsError::Format(format!(
                "{}: unsupported format version {} (expected {})",
                self.path.display(),
                doc.version,
                FORMAT_VERSION
            )));
        }

        if let Some(bad) = doc.entries.keys().find(|k| k.is_empty()) {
            return Err(SettingsError::Format(format!(
                "{}: invalid empty key {:?}",
                self.path.display(),
                bad
            )));
        }

        Ok(doc.entries)
    }

    fn persist(&mut self, entries: &Entries) -> Result<(), SettingsError> {
        // Ensure directory exists
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let doc = DocumentRef { version: FORMAT_VERSION, entries };
        let json = serde_json::to_string_pretty(&doc)?;

        // Atomic: write .tmp then rename; the .tmp never outlives a failure
        let tmp_path = self.temp_path();
        let result = write_synced(&tmp_path, json.as_bytes()).and_then(|()| fs::rename(&tmp_path, &self.path));
        if let Err(e) = result {
            let _ = fs::remove_file(&tmp_path);
            return Err(SettingsError::Io(format!(
                "failed to write {} via {}: {}",
                self.path.display(),
                tmp_path.display(),
                e
            )));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use tempfile::TempDir;

    fn sample() -> Entries {
        let mut entries = Entries::new();
        entries.insert("boolKey".to_string(), Value::Boolean(false));
        entries.insert("numberKey".to_string(), Value::Number(54.321));
        entries.insert("stringKey".to_string(), Value::String("String value".to_string()));
        entries
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let mut backend = JsonFileBackend::new(dir.path().join("settings.json"));
        assert!(backend.load().unwrap().is_empty());
    }

    #[test]
    fn test_persist_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        JsonFileBackend::new(&path).persist(&sample()).expect("persist should succeed");
        assert!(path.exists());
        assert!(!dir.path().join("nested").join("settings.json.tmp").exists());

        let loaded = JsonFileBackend::new(&path).load().expect("load should succeed");
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_comment_lines_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{
    // hand-edited
    "version": 1,
    "entries": {
        // feature flags
        "ui.darkMode": { "type": "boolean", "value": true }
    }
}
"#,
        )
        .unwrap();

        let loaded = JsonFileBackend::new(&path).load().unwrap();
        assert_eq!(loaded.get("ui.darkMode"), Some(&Value::Boolean(true)));
    }

    #[test]
    fn test_malformed_file_is_format_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let err = JsonFileBackend::new(&path).load().unwrap_err();
        assert!(matches!(err, SettingsError::Format(_)), "got {err:?}");
    }

    #[test]
    fn test_future_version_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"version": 99, "entries": {}}"#).unwrap();

        let err = JsonFileBackend::new(&path).load().unwrap_err();
        assert!(err.to_string().contains("unsupported format version 99"));
    }

    #[test]
    fn test_persist_into_unwritable_location_fails() {
        let dir = TempDir::new().unwrap();
        // A regular file where a directory is expected
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();

        let mut backend = JsonFileBackend::new(blocker.join("settings.json"));
        let err = backend.persist(&sample()).unwrap_err();
        assert!(err.is_persistence());
    }

    #[test]
    fn test_failed_persist_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        // A directory where the settings file should go: the rename fails
        let path = dir.path().join("settings.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let mut backend = JsonFileBackend::new(&path);
        let err = backend.persist(&sample()).unwrap_err();
        assert!(err.is_persistence());
        assert!(!dir.path().join("settings.json.tmp").exists());
        assert!(path.join("keep").exists());
    }
}
