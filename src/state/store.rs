use serde_json::Value;
use streamdeck_lib::Context;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stored value under `{key}` is not a number: {found}")]
    Malformed { key: String, found: String },
    #[error("write to `{key}` rejected: {reason}")]
    Rejected { key: String, reason: String },
}

/// Minimal durable key-value store. Every call may fail; callers treat
/// failures as non-fatal.
pub trait KvStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Stream Deck global settings, persisted by the Stream Deck app.
pub struct GlobalsStore {
    cx: Context,
}

impl GlobalsStore {
    pub fn new(cx: &Context) -> Self {
        Self { cx: cx.clone() }
    }
}

impl KvStore for GlobalsStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let stored: Option<Value> = self.cx.globals().get(key).map(|v| v.clone());
        decode_stored(key, stored)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if value.parse::<i64>().is_err() {
            return Err(StoreError::Rejected {
                key: key.to_string(),
                reason: format!("`{value}` is not a decimal integer"),
            });
        }
        self.cx.globals().with_mut(|m| {
            m.insert(key.to_string(), Value::String(value.to_string()));
        });
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.cx.globals().with_mut(|m| {
            m.remove(key);
        });
        Ok(())
    }
}

/// Text form of a globals entry. Strings pass through; a bare JSON number
/// (written by hand into global settings) is tolerated.
fn decode_stored(key: &str, stored: Option<Value>) -> Result<Option<String>, StoreError> {
    match stored {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(StoreError::Malformed {
            key: key.to_string(),
            found: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_strings_and_bare_numbers() {
        assert_eq!(decode_stored("counter", None).unwrap(), None);
        assert_eq!(decode_stored("counter", Some(Value::Null)).unwrap(), None);
        assert_eq!(
            decode_stored("counter", Some(json!("-7"))).unwrap().as_deref(),
            Some("-7")
        );
        assert_eq!(
            decode_stored("counter", Some(json!(12))).unwrap().as_deref(),
            Some("12")
        );
    }

    #[test]
    fn rejects_structured_values() {
        let err = decode_stored("counter", Some(json!({ "n": 1 }))).unwrap_err();
        assert!(matches!(err, StoreError::Malformed { ref key, .. } if key == "counter"));
    }
}
