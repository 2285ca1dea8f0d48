//! Runtime values and the text coercion table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A typed runtime value.
///
/// Variables, matched command arguments, and command results all carry a
/// `Value`. Structured data (arrays, objects) lives in `Json`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Structured JSON data (arrays, objects, nested structures).
    Json(serde_json::Value),
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        value_to_json(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(json_to_value(json))
    }
}

impl Value {
    /// The declared type this value belongs to. `Null` reports `Any`.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Any,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::Json(_) => ValueType::Json,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Convert an already typed value to another type.
    ///
    /// Same-type and `Any` targets pass through, `Int` widens to `Float`,
    /// everything else goes through the value's text form.
    pub fn coerce_to(self, target: ValueType) -> Result<Value, CoercionError> {
        if target == ValueType::Any || self.value_type() == target {
            return Ok(self);
        }
        match self {
            Value::Int(i) if target == ValueType::Float => Ok(Value::Float(i as f64)),
            Value::Null if target == ValueType::String => Ok(Value::String(String::new())),
            other => target.parse(&other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::Json(json) => write!(f, "{json}"),
        }
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

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Declared type of a parameter slot or variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueType {
    /// Accepts any text unchanged.
    #[default]
    Any,
    Bool,
    Int,
    Float,
    String,
    Json,
}

/// Token text could not be converted to the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected}, got '{text}'")]
pub struct CoercionError {
    pub expected: ValueType,
    pub text: String,
}

impl ValueType {
    /// Coerce raw token text into a value of this type.
    pub fn parse(self, text: &str) -> Result<Value, CoercionError> {
        let fail = || CoercionError {
            expected: self,
            text: text.to_string(),
        };
        match self {
            ValueType::Any | ValueType::String => Ok(Value::String(text.to_string())),
            ValueType::Bool => match text.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
                _ => Err(fail()),
            },
            ValueType::Int => text.trim().parse::<i64>().map(Value::Int).map_err(|_| fail()),
            ValueType::Float => text
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| fail()),
            ValueType::Json => serde_json::from_str::<serde_json::Value>(text)
                .map(Value::Json)
                .map_err(|_| fail()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Any => "any",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Json => "json",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(ValueType::Any),
            "bool" | "boolean" => Ok(ValueType::Bool),
            "int" | "integer" => Ok(ValueType::Int),
            "float" | "number" => Ok(ValueType::Float),
            "string" | "str" => Ok(ValueType::String),
            "json" => Ok(ValueType::Json),
            other => Err(format!("unknown type: {other}")),
        }
    }
}

/// Convert a Value to its JSON representation. Non-finite floats become null.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Json(json) => json.clone(),
    }
}

/// Convert JSON back into a Value, keeping arrays and objects as `Json`.
pub fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        serde_json::Value::String(s) => Value::String(s),
        other => Value::Json(other),
    }
}
