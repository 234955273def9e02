// Value model: the three scalar kinds a setting can hold

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Type-tag of a stored entry, fixed by the accessor that wrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Boolean,
    Number,
    String,
}

impl ValueKind {
    pub const ALL: [ValueKind; 3] = [ValueKind::Boolean, ValueKind::Number, ValueKind::String];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
        }
    }

    /// Parse a kind name. Accepts the short aliases used on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "boolean" | "bool" => Some(ValueKind::Boolean),
            "number" | "num" => Some(ValueKind::Number),
            "string" | "str" => Some(ValueKind::String),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored setting value.
///
/// Serialized as `{"type": "boolean", "value": true}` so the type-tag survives
/// persistence even where the encoding could blur it (e.g. `1` vs `1.0`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Parse command-line text as a value of `kind`.
    ///
    /// Strict: booleans must be `true`/`false`, numbers must be finite.
    /// Nothing is coerced across kinds and surrounding whitespace is kept.
    pub fn parse(key: &str, kind: ValueKind, text: &str) -> Result<Value, SettingsError> {
        let mismatch = || SettingsError::TypeMismatch {
            key: key.to_string(),
            expected: kind,
            found: format!("\"{text}\""),
        };
        match kind {
            ValueKind::Boolean => match text {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                _ => Err(mismatch()),
            },
            ValueKind::Number => {
                let n: f64 = text.parse().map_err(|_| mismatch())?;
                check_finite(key, n)?;
                Ok(Value::Number(n))
            }
            ValueKind::String => Ok(Value::String(text.to_string())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Keys must be non-empty. Case is significant; no other normalization.
pub fn validate_key(key: &str) -> Result<(), SettingsError> {
    if key.is_empty() {
        return Err(SettingsError::InvalidKey("key must not be empty".to_string()));
    }
    Ok(())
}

pub(crate) fn check_finite(key: &str, n: f64) -> Result<(), SettingsError> {
    if n.is_finite() {
        Ok(())
    } else {
        Err(SettingsError::NonFinite { key: key.to_string(), value: n })
    }
}
