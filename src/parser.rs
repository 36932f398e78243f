//! Typed parsing of configuration JSON.
//!
//! Whole documents deserialize through serde; single values are looked up by
//! key and coerced leniently (`"true"` reads as a boolean, `"42"` as a number).

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A scalar type that can be read out of a configuration value.
pub trait ConfigValue: Sized {
    /// Converts a JSON value, `None` when the value cannot represent `Self`.
    fn from_json(value: &Value) -> Option<Self>;
}

impl ConfigValue for String {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl ConfigValue for bool {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) => Some(s.eq_ignore_ascii_case("true")),
            _ => None,
        }
    }
}

impl ConfigValue for i64 {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate_to_i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Whole part of `f`, `None` when it does not fit an `i64`.
fn truncate_to_i64(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    let f = f.trunc();
    (f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
}

impl ConfigValue for i32 {
    fn from_json(value: &Value) -> Option<Self> {
        i64::from_json(value).and_then(|n| i32::try_from(n).ok())
    }
}

impl ConfigValue for f64 {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Converts raw configuration JSON into caller specified shapes.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConfigurationParser;

impl ConfigurationParser {
    pub fn new() -> Self {
        Self
    }

    /// Deserialize the whole configuration into `T`.
    ///
    /// Give `T` `#[serde(default)]` to fall back to defaults for absent fields.
    pub fn parse<T: DeserializeOwned>(&self, json: &str) -> Result<T> {
        if json.is_empty() {
            return Err(Error::invalid_argument("config is null or empty"));
        }

        serde_json::from_str(json).map_err(|e| Error::parsing_failed(e, json))
    }

    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` when the key is absent.
    pub fn parse_value<T: ConfigValue>(&self, json: &str, key: &str) -> Result<Option<T>> {
        if json.is_empty() {
            return Err(Error::invalid_argument("config is null or empty"));
        }
        if key.is_empty() {
            return Err(Error::invalid_argument("key is null or empty"));
        }

        let root: Value = serde_json::from_str(json).map_err(|e| Error::parsing_failed(e, json))?;
        let object = root
            .as_object()
            .ok_or_else(|| Error::parsing_failed("configuration root is not an object", json))?;

        match object.get(key) {
            None => Ok(None),
            Some(value) => T::from_json(value).map(Some).ok_or_else(|| {
                Error::parsing_failed(
                    format!(
                        "value of '{}' cannot be read as {}",
                        key,
                        std::any::type_name::<T>()
                    ),
                    json,
                )
            }),
        }
    }
}
