use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Storage type a field prefers when a backend has a choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    String,
    Integer,
    Float,
    Date,
}

impl fmt::Display for StoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Date => "date",
        };
        f.write_str(name)
    }
}

/// A scalar as exchanged with a storage backend.
///
/// Relational backends map these onto column types, tree backends onto
/// attribute or element text, delimited-text backends onto cells. `Null` is
/// the representation-independent absence of a value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Date(NaiveDateTime),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The store type this value carries, `None` for null.
    pub fn store_type(&self) -> Option<StoreType> {
        match self {
            Self::Null => None,
            Self::Text(_) => Some(StoreType::String),
            Self::Int(_) => Some(StoreType::Integer),
            Self::Float(_) => Some(StoreType::Float),
            Self::Date(_) => Some(StoreType::Date),
        }
    }

    /// Short description used in conversion diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Self::Null => "null".into(),
            Self::Text(s) => format!("text {s:?}"),
            Self::Int(i) => format!("integer {i}"),
            Self::Float(x) => format!("float {x}"),
            Self::Date(d) => format!("date {d}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Self::Date(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_type_of_values() {
        assert_eq!(Value::Null.store_type(), None);
        assert_eq!(Value::from("a").store_type(), Some(StoreType::String));
        assert_eq!(Value::from(1i64).store_type(), Some(StoreType::Integer));
        assert_eq!(Value::from(1.5).store_type(), Some(StoreType::Float));
    }

    #[test]
    fn serde_roundtrip_preserves_variant() {
        let values = vec![Value::Null, Value::from("x"), Value::Int(-3), Value::Float(0.25)];
        let json = serde_json::to_string(&values).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, values);
    }

    #[test]
    fn store_type_serializes_lowercase() {
        let json = serde_json::to_string(&StoreType::Integer).unwrap();
        assert_eq!(json, "\"integer\"");
    }
}
