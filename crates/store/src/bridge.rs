// Untyped boundary for script bindings and JSON callers
//
// Arguments arrive as `serde_json::Value` with no static type guarantees.
// Every key and value is shape-checked here before it reaches the store,
// and absence comes back as `Null`.

use serde_json::Value as JsonValue;

use crate::backend::Backend;
use crate::error::SettingsError;
use crate::store::SettingsStore;
use crate::value::{Value, ValueKind};

/// Name of a JSON value's shape, for error messages.
fn json_kind(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Validate a key argument.
pub fn key_arg(key: &JsonValue) -> Result<&str, SettingsError> {
    match key {
        JsonValue::Null => Err(SettingsError::InvalidKey("key is null or undefined".to_string())),
        JsonValue::String(s) if s.is_empty() => {
            Err(SettingsError::InvalidKey("key must not be empty".to_string()))
        }
        JsonValue::String(s) => Ok(s),
        other => Err(SettingsError::InvalidKey(format!(
            "key must be a string, got {}",
            json_kind(other)
        ))),
    }
}

/// Convert a value argument for an accessor of `kind`. No coercion: `"123"`
/// is not a number and `1` is not a boolean.
pub fn value_arg(key: &str, kind: ValueKind, value: &JsonValue) -> Result<Value, SettingsError> {
    let converted = match (kind, value) {
        (ValueKind::Boolean, JsonValue::Bool(b)) => Some(Value::Boolean(*b)),
        (ValueKind::Number, JsonValue::Number(n)) => n.as_f64().map(Value::Number),
        (ValueKind::String, JsonValue::String(s)) => Some(Value::String(s.clone())),
        _ => None,
    };
    match converted {
        Some(Value::Number(n)) if !n.is_finite() => {
            Err(SettingsError::NonFinite { key: key.to_string(), value: n })
        }
        Some(v) => Ok(v),
        None => Err(SettingsError::TypeMismatch {
            key: key.to_string(),
            expected: kind,
            found: json_kind(value).to_string(),
        }),
    }
}

/// Bare JSON form of a stored value (no type-tag). Numbers that JSON cannot
/// represent come back as `Null`, though the store never holds them.
pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Boolean(b) => JsonValue::Bool(*b),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::String(s) => JsonValue::String(s.clone()),
    }
}

/// Untyped view over a [`SettingsStore`].
pub struct Bridge<'a, B: Backend> {
    store: &'a mut SettingsStore<B>,
}

impl<'a, B: Backend> Bridge<'a, B> {
    pub fn new(store: &'a mut SettingsStore<B>) -> Self {
        Self { store }
    }

    pub fn set_boolean(&mut self, key: &JsonValue, value: &JsonValue) -> Result<(), SettingsError> {
        self.set(ValueKind::Boolean, key, value)
    }

    pub fn set_number(&mut self, key: &JsonValue, value: &JsonValue) -> Result<(), SettingsError> {
        self.set(ValueKind::Number, key, value)
    }

    pub fn set_string(&mut self, key: &JsonValue, value: &JsonValue) -> Result<(), SettingsError> {
        self.set(ValueKind::String, key, value)
    }

    fn set(&mut self, kind: ValueKind, key: &JsonValue, value: &JsonValue) -> Result<(), SettingsError> {
        let key = key_arg(key)?;
        let value = value_arg(key, kind, value)?;
        self.store.set_as(kind, key, value)
    }

    pub fn get_boolean(&self, key: &JsonValue, default: Option<&JsonValue>) -> Result<JsonValue, SettingsError> {
        self.get(ValueKind::Boolean, key, default)
    }

    pub fn get_number(&self, key: &JsonValue, default: Option<&JsonValue>) -> Result<JsonValue, SettingsError> {
        self.get(ValueKind::Number, key, default)
    }

    pub fn get_string(&self, key: &JsonValue, default: Option<&JsonValue>) -> Result<JsonValue, SettingsError> {
        self.get(ValueKind::String, key, default)
    }

    fn get(&self, kind: ValueKind, key: &JsonValue, default: Option<&JsonValue>) -> Result<JsonValue, SettingsError> {
        let key = key_arg(key)?;
        // An explicit null default means "no default"
        let default = match default {
            None | Some(JsonValue::Null) => None,
            Some(d) => Some(value_arg(key, kind, d)?),
        };
        let stored = self.store.get(key).filter(|v| v.kind() == kind);
        Ok(stored.or(default.as_ref()).map(value_to_json).unwrap_or(JsonValue::Null))
    }

    pub fn has_key(&self, key: &JsonValue) -> Result<bool, SettingsError> {
        self.store.has_key(key_arg(key)?)
    }

    pub fn remove(&mut self, key: &JsonValue) -> Result<(), SettingsError> {
        self.store.remove(key_arg(key)?)
    }

    pub fn clear(&mut self) {
        self.store.clear();
    }

    pub fn get_all_keys(&self) -> JsonValue {
        JsonValue::Array(self.store.keys().map(|k| JsonValue::String(k.to_string())).collect())
    }

    pub fn flush(&mut self) -> bool {
        self.store.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invalid_keys_rejected() {
        let mut store = SettingsStore::in_memory();
        let bridge = Bridge::new(&mut store);

        for bad in [json!(null), json!(123), json!(true), json!(["a"]), json!({"k": 1}), json!("")] {
            let err = bridge.has_key(&bad).unwrap_err();
            assert!(err.is_invalid_argument(), "{bad} should be rejected");
        }
        assert!(!bridge.has_key(&json!("string")).unwrap());
    }

    #[test]
    fn test_invalid_key_message() {
        assert_eq!(
            key_arg(&json!(123)).unwrap_err().to_string(),
            "invalid key: key must be a string, got number"
        );
        assert_eq!(
            key_arg(&json!(null)).unwrap_err().to_string(),
            "invalid key: key is null or undefined"
        );
    }

    #[test]
    fn test_cross_type_writes_rejected() {
        let mut store = SettingsStore::in_memory();
        let key = json!("boolKey");
        {
            let mut bridge = Bridge::new(&mut store);
            assert!(bridge.set_boolean(&key, &json!("str")).is_err());
            assert!(bridge.set_boolean(&key, &json!(123)).is_err());
            assert!(bridge.set_string(&key, &json!(true)).is_err());
            assert!(bridge.set_string(&key, &json!(123)).is_err());
            assert!(bridge.set_number(&key, &json!(true)).is_err());
            assert!(bridge.set_number(&key, &json!("123")).is_err());
        }
        assert!(!store.has_key("boolKey").unwrap());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_roundtrip_through_bridge() {
        let mut store = SettingsStore::in_memory();
        let mut bridge = Bridge::new(&mut store);

        bridge.set_boolean(&json!("boolKey"), &json!(false)).unwrap();
        bridge.set_number(&json!("numberKey"), &json!(54.321)).unwrap();
        bridge.set_string(&json!("stringKey"), &json!("String value")).unwrap();

        assert_eq!(bridge.get_boolean(&json!("boolKey"), None).unwrap(), json!(false));
        assert_eq!(bridge.get_number(&json!("numberKey"), None).unwrap(), json!(54.321));
        assert_eq!(bridge.get_string(&json!("stringKey"), None).unwrap(), json!("String value"));
        assert_eq!(
            bridge.get_all_keys(),
            json!(["boolKey", "numberKey", "stringKey"])
        );
        assert!(bridge.flush());
    }

    #[test]
    fn test_defaults() {
        let mut store = SettingsStore::in_memory();
        let bridge = Bridge::new(&mut store);

        let missing = json!("noStringKey");
        assert_eq!(bridge.get_string(&missing, None).unwrap(), JsonValue::Null);
        assert_eq!(bridge.get_string(&missing, Some(&json!(null))).unwrap(), JsonValue::Null);
        assert_eq!(
            bridge.get_string(&missing, Some(&json!("No string value"))).unwrap(),
            json!("No string value")
        );
        assert_eq!(bridge.get_boolean(&json!("noBoolKey"), Some(&json!(true))).unwrap(), json!(true));
        assert_eq!(bridge.get_number(&json!("noNumberKey"), Some(&json!(123.45))).unwrap(), json!(123.45));

        // Default of the wrong shape is a caller error
        assert!(bridge.get_number(&json!("noNumberKey"), Some(&json!("123"))).is_err());
    }

    #[test]
    fn test_remove_via_bridge() {
        let mut store = SettingsStore::in_memory();
        let mut bridge = Bridge::new(&mut store);
        bridge.set_string(&json!("stringKey"), &json!("v")).unwrap();

        bridge.remove(&json!("stringKey")).unwrap();
        bridge.remove(&json!("stringKey")).unwrap();
        assert!(!bridge.has_key(&json!("stringKey")).unwrap());
        assert!(bridge.remove(&json!(null)).is_err());

        bridge.set_boolean(&json!("boolKey"), &json!(true)).unwrap();
        bridge.clear();
        assert_eq!(bridge.get_all_keys(), json!([]));
    }
}
