//! Values as the foreign provider types them.
//!
//! Unlike [`PropertyValue`](crate::PropertyValue), a [`ForeignValue`] keeps the
//! distinction between integers and floats, and between ordered lists and
//! unordered sets. Nested blocks are represented as `Map` values keyed by the
//! foreign attribute name.

use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// The string the foreign provider writes in place of a value it does not know yet.
pub const UNKNOWN_SENTINEL: &str = "74D93920-ED26-11E3-AC10-0800200C9A66";

/// A value typed by the foreign provider's schema.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ForeignValue {
    #[default]
    Null,
    Unknown,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<ForeignValue>),
    /// Element order carries no meaning; identity is content-derived.
    Set(Vec<ForeignValue>),
    Map(BTreeMap<String, ForeignValue>),
}

impl ForeignValue {
    pub fn string(s: impl Into<String>) -> Self {
        ForeignValue::String(s.into())
    }

    /// Builds a map value from `(key, value)` pairs.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, ForeignValue)>) -> Self {
        ForeignValue::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, ForeignValue::Null)
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, ForeignValue::Unknown)
    }

    /// True for empty lists, sets and maps. Scalars and null are not collections.
    #[must_use]
    pub fn is_empty_collection(&self) -> bool {
        match self {
            ForeignValue::List(items) | ForeignValue::Set(items) => items.is_empty(),
            ForeignValue::Map(map) => map.is_empty(),
            _ => false,
        }
    }

    /// The elements of a list or set.
    pub fn as_elements(&self) -> Option<&[ForeignValue]> {
        match self {
            ForeignValue::List(items) | ForeignValue::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ForeignValue>> {
        match self {
            ForeignValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ForeignValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Looks up a key of a map value.
    pub fn get(&self, key: &str) -> Option<&ForeignValue> {
        self.as_map().and_then(|m| m.get(key))
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            ForeignValue::Null => "null",
            ForeignValue::Unknown => "unknown",
            ForeignValue::Bool(_) => "bool",
            ForeignValue::Int(_) => "int",
            ForeignValue::Float(_) => "float",
            ForeignValue::String(_) => "string",
            ForeignValue::List(_) => "list",
            ForeignValue::Set(_) => "set",
            ForeignValue::Map(_) => "map",
        }
    }

    /// True if this value or anything nested in it is unknown.
    #[must_use]
    pub fn contains_unknowns(&self) -> bool {
        match self {
            ForeignValue::Unknown => true,
            ForeignValue::List(items) | ForeignValue::Set(items) => {
                items.iter().any(ForeignValue::contains_unknowns)
            }
            ForeignValue::Map(map) => map.values().any(ForeignValue::contains_unknowns),
            _ => false,
        }
    }

    /// Renders this value as untyped JSON, writing unknowns as [`UNKNOWN_SENTINEL`].
    ///
    /// Sets become arrays in their current element order.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            ForeignValue::Null => Value::Null,
            ForeignValue::Unknown => Value::String(UNKNOWN_SENTINEL.to_string()),
            ForeignValue::Bool(b) => Value::Bool(*b),
            ForeignValue::Int(i) => Value::Number(Number::from(*i)),
            ForeignValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            ForeignValue::String(s) => Value::String(s.clone()),
            ForeignValue::List(items) | ForeignValue::Set(items) => {
                Value::Array(items.iter().map(ForeignValue::to_json).collect())
            }
            ForeignValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }

    /// Reads untyped JSON without a schema.
    ///
    /// Arrays always become lists and integral numbers become `Int`; callers
    /// that know the schema refine these (see the marshaler's raw state codec).
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => ForeignValue::Null,
            Value::Bool(b) => ForeignValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ForeignValue::Int(i),
                None => ForeignValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) if s == UNKNOWN_SENTINEL => ForeignValue::Unknown,
            Value::String(s) => ForeignValue::String(s.clone()),
            Value::Array(items) => ForeignValue::List(items.iter().map(ForeignValue::from_json).collect()),
            Value::Object(map) => ForeignValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), ForeignValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for ForeignValue {
    fn from(s: &str) -> Self {
        ForeignValue::String(s.to_string())
    }
}

impl From<String> for ForeignValue {
    fn from(s: String) -> Self {
        ForeignValue::String(s)
    }
}

impl From<bool> for ForeignValue {
    fn from(b: bool) -> Self {
        ForeignValue::Bool(b)
    }
}

impl From<i64> for ForeignValue {
    fn from(i: i64) -> Self {
        ForeignValue::Int(i)
    }
}

impl From<f64> for ForeignValue {
    fn from(f: f64) -> Self {
        ForeignValue::Float(f)
    }
}
