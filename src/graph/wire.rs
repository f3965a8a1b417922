//! Wire-level decoding for the graph store protocol.
//!
//! The store responds with JSON whose scalar fields arrive either naked
//! (`"AAPL"`, `0.7`) or wrapped in a type tag (`{"String": "AAPL"}`,
//! `{"F64": 0.7}`, `{"U32": 3}`). Both forms must decode identically.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A scalar as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HelixScalar {
    Tagged(TaggedScalar),
    Naked(Value),
}

/// The explicitly tagged wrapper form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaggedScalar {
    String(String),
    F64(f64),
    U32(u32),
}

impl HelixScalar {
    /// Unwrap to a string; null/undefined/absent becomes the empty string.
    pub fn as_string(&self) -> String {
        match self {
            HelixScalar::Tagged(TaggedScalar::String(s)) => s.clone(),
            HelixScalar::Tagged(TaggedScalar::F64(x)) => x.to_string(),
            HelixScalar::Tagged(TaggedScalar::U32(n)) => n.to_string(),
            HelixScalar::Naked(Value::String(s)) => s.clone(),
            HelixScalar::Naked(Value::Number(n)) => n.to_string(),
            HelixScalar::Naked(Value::Bool(b)) => b.to_string(),
            HelixScalar::Naked(_) => String::new(),
        }
    }

    /// Unwrap to f64; null/undefined/non-numeric becomes 0.
    pub fn as_f64(&self) -> f64 {
        match self {
            HelixScalar::Tagged(TaggedScalar::F64(x)) => *x,
            HelixScalar::Tagged(TaggedScalar::U32(n)) => *n as f64,
            HelixScalar::Tagged(TaggedScalar::String(s)) => s.parse().unwrap_or(0.0),
            HelixScalar::Naked(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            HelixScalar::Naked(Value::String(s)) => s.parse().unwrap_or(0.0),
            HelixScalar::Naked(_) => 0.0,
        }
    }

    /// Unwrap to u32; null/undefined/non-numeric becomes 0.
    pub fn as_u32(&self) -> u32 {
        match self {
            HelixScalar::Tagged(TaggedScalar::U32(n)) => *n,
            HelixScalar::Tagged(TaggedScalar::F64(x)) => *x as u32,
            HelixScalar::Tagged(TaggedScalar::String(s)) => s.parse().unwrap_or(0),
            HelixScalar::Naked(Value::Number(n)) => n.as_u64().unwrap_or(0) as u32,
            HelixScalar::Naked(Value::String(s)) => s.parse().unwrap_or(0),
            HelixScalar::Naked(_) => 0,
        }
    }
}

/// Read a string field out of a wire object, accepting both scalar forms.
pub fn unwrap_string(obj: &Value, key: &str) -> String {
    obj.get(key)
        .map(|v| decode_scalar(v).as_string())
        .unwrap_or_default()
}

/// Read an f64 field out of a wire object, accepting both scalar forms.
pub fn unwrap_f64(obj: &Value, key: &str) -> f64 {
    obj.get(key).map(|v| decode_scalar(v).as_f64()).unwrap_or(0.0)
}

/// Read a u32 field out of a wire object, accepting both scalar forms.
pub fn unwrap_u32(obj: &Value, key: &str) -> u32 {
    obj.get(key).map(|v| decode_scalar(v).as_u32()).unwrap_or(0)
}

/// Strip type-tag wrappers from an arbitrary JSON tree.
///
/// Objects are rebuilt field by field, arrays element by element; wrapper
/// objects collapse to their naked scalar.
pub fn normalize_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            if let HelixScalar::Tagged(tagged) = decode_scalar(value) {
                return match tagged {
                    TaggedScalar::String(s) => Value::String(s),
                    TaggedScalar::F64(x) => {
                        serde_json::Number::from_f64(x).map(Value::Number).unwrap_or(Value::Null)
                    }
                    TaggedScalar::U32(n) => Value::Number(n.into()),
                };
            }
            Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), normalize_value(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(normalize_value).collect()),
        other => other.clone(),
    }
}

fn decode_scalar(value: &Value) -> HelixScalar {
    if let Value::Object(map) = value {
        if map.len() == 1 {
            if let Some(Value::String(s)) = map.get("String") {
                return HelixScalar::Tagged(TaggedScalar::String(s.clone()));
            }
            if let Some(v) = map.get("F64") {
                if let Some(x) = v.as_f64() {
                    return HelixScalar::Tagged(TaggedScalar::F64(x));
                }
            }
            if let Some(v) = map.get("U32") {
                if let Some(n) = v.as_u64() {
                    return HelixScalar::Tagged(TaggedScalar::U32(n as u32));
                }
            }
        }
    }
    HelixScalar::Naked(value.clone())
}

/// Builder for the JSON parameter map sent with a named query.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    inner: HashMap<String, Value>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.inner.insert(key.to_string(), value.into());
        self
    }

    pub fn set_opt(mut self, key: &str, value: Option<impl Into<Value>>) -> Self {
        if let Some(v) = value {
            self.inner.insert(key.to_string(), v.into());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.inner.into_iter().collect())
    }
}
