// Embedded database backend using SQLite

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use super::{Backend, Entries};
use crate::error::SettingsError;
use crate::value::Value;
use crate::FORMAT_VERSION;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    key TEXT PRIMARY KEY NOT NULL,
    value_type INTEGER NOT NULL,  -- 0=boolean, 1=number, 2=string
    value_num REAL,               -- boolean stored as 0/1
    value_text TEXT
);

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

// Value type constants
const TYPE_BOOLEAN: i32 = 0;
const TYPE_NUMBER: i32 = 1;
const TYPE_STRING: i32 = 2;

/// Settings persisted in a SQLite database file.
///
/// The database file is created on the first persist; loading a missing
/// file yields no entries and leaves the filesystem untouched.
pub struct SqliteBackend {
    conn: Option<Connection>,
    path: Option<PathBuf>,
}

impl SqliteBackend {
    /// Open the database at `path`, if it exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let conn = if path.exists() {
            Some(Self::init(Connection::open(path)?)?)
        } else {
            None
        };
        Ok(Self { conn, path: Some(path.to_path_buf()) })
    }

    /// Private in-memory database, mostly useful in tests.
    pub fn open_in_memory() -> Result<Self, SettingsError> {
        let conn = Self::init(Connection::open_in_memory()?)?;
        Ok(Self { conn: Some(conn), path: None })
    }

    fn init(conn: Connection) -> Result<Connection, SettingsError> {
        conn.execute_batch(SCHEMA)?;

        let version: Option<String> = conn
            .query_row("SELECT value FROM meta WHERE key = 'format_version'", [], |row| row.get(0))
            .optional()?;

        match version {
            None => {
                conn.execute(
                    "INSERT INTO meta (key, value) VALUES ('format_version', ?1)",
                    params![FORMAT_VERSION.to_string()],
                )?;
            }
            Some(v) if v == FORMAT_VERSION.to_string() => {}
            Some(v) => {
                return Err(SettingsError::Format(format!(
                    "unsupported format version {} (expected {})",
                    v, FORMAT_VERSION
                )));
            }
        }

        Ok(conn)
    }

    /// Connection to the database, creating the file on first use.
    fn connection(&mut self) -> Result<&mut Connection, SettingsError> {
        if self.conn.is_none() {
            if let Some(path) = &self.path {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                log::debug!("Creating settings database {}", path.display());
                self.conn = Some(Self::init(Connection::open(path)?)?);
            }
        }
        self.conn
            .as_mut()
            .ok_or_else(|| SettingsError::Database("no database connection".to_string()))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn decode_row(
    key: &str,
    value_type: i32,
    value_num: Option<f64>,
    value_text: Option<String>,
) -> Result<Value, SettingsError> {
    let missing = |column: &str| {
        SettingsError::Format(format!("entry '{key}': missing {column} for type {value_type}"))
    };
    match value_type {
        TYPE_BOOLEAN => Ok(Value::Boolean(value_num.ok_or_else(|| missing("value_num"))? != 0.0)),
        TYPE_NUMBER => {
            let n = value_num.ok_or_else(|| missing("value_num"))?;
            if !n.is_finite() {
                return Err(SettingsError::Format(format!("entry '{key}': non-finite number")));
            }
            Ok(Value::Number(n))
        }
        TYPE_STRING => Ok(Value::String(value_text.ok_or_else(|| missing("value_text"))?)),
        other => Err(SettingsError::Format(format!("entry '{key}': unknown value type {other}"))),
    }
}

impl Backend for SqliteBackend {
    fn load(&mut self) -> Result<Entries, SettingsError> {
        let on_disk = self.path.as_deref().map_or(false, Path::exists);
        if self.conn.is_none() && !on_disk {
            return Ok(Entries::new());
        }

        let mut stmt = self
            .connection()?
            .prepare("SELECT key, value_type, value_num, value_text FROM entries")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i32>(1)?,
                row.get::<_, Option<f64>>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;

        let mut entries = Entries::new();
        for row in rows {
            let (key, value_type, value_num, value_text) = row?;
            if key.is_empty() {
                return Err(SettingsError::Format("invalid empty key".to_string()));
            }
            let value = decode_row(&key, value_type, value_num, value_text)?;
            entries.insert(key, value);
        }
        Ok(entries)
    }

    fn persist(&mut self, entries: &Entries) -> Result<(), SettingsError> {
        let tx = self.connection()?.transaction()?;
        tx.execute("DELETE FROM entries", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO entries (key, value_type, value_num, value_text) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (key, value) in entries {
                let (value_type, value_num, value_text): (i32, Option<f64>, Option<&str>) = match value {
                    Value::Boolean(b) => (TYPE_BOOLEAN, Some(if *b { 1.0 } else { 0.0 }), None),
                    Value::Number(n) => (TYPE_NUMBER, Some(*n), None),
                    Value::String(s) => (TYPE_STRING, None, Some(s.as_str())),
                };
                stmt.execute(params![key, value_type, value_num, value_text])?;
            }
        }
        // Dropping the transaction without commit rolls back
        tx.commit()?;
        Ok(())
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("sqlite:{}", path.display()),
            None => "sqlite::memory:".to_string(),
        }
    }
}
