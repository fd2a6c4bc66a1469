//! Destination-side property values.
//!
//! A [`PropertyValue`] is the orchestration engine's structured value. Besides
//! plain JSON-like data it can carry three markers:
//! - `Secret` wraps a value that must be masked,
//! - `Computed` stands for a value that is not known yet,
//! - `Output` attaches a set of resource dependencies (and known/secret flags).
//!
//! Markers propagate upward: a container holding a secret or unknown value is
//! itself considered secret or unknown. The queries [`PropertyValue::contains_secrets`]
//! and [`PropertyValue::contains_unknowns`] implement that rule.

use crate::path::{PathSegment, PropertyPath};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A mapping of property names to values. Key order carries no meaning.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// A value with attached output dependencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub element: Box<PropertyValue>,
    pub known: bool,
    pub secret: bool,
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
}

/// A structured property value of the destination model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<PropertyValue>),
    Object(PropertyMap),
    Secret(Box<PropertyValue>),
    Computed,
    Output(Output),
}

impl PropertyValue {
    /// Wraps a value as secret. Already-secret values are returned unchanged.
    #[must_use]
    pub fn secret(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Secret(_) => value,
            PropertyValue::Output(mut out) => {
                out.secret = true;
                PropertyValue::Output(out)
            }
            other => PropertyValue::Secret(Box::new(other)),
        }
    }

    /// Shorthand for a string value.
    pub fn string(s: impl Into<String>) -> Self {
        PropertyValue::String(s.into())
    }

    /// Shorthand for an object value built from `(key, value)` pairs.
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, PropertyValue)>) -> Self {
        PropertyValue::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// True for the unknown marker and for outputs whose value is not known.
    #[must_use]
    pub fn is_computed(&self) -> bool {
        match self {
            PropertyValue::Computed => true,
            PropertyValue::Output(out) => !out.known || out.element.is_computed(),
            PropertyValue::Secret(inner) => inner.is_computed(),
            _ => false,
        }
    }

    /// True when this value itself is marked secret (not its children).
    #[must_use]
    pub fn is_secret(&self) -> bool {
        match self {
            PropertyValue::Secret(_) => true,
            PropertyValue::Output(out) => out.secret,
            _ => false,
        }
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, PropertyValue::Array(_))
    }

    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, PropertyValue::Object(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PropertyValue]> {
        match self {
            PropertyValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&PropertyMap> {
        match self {
            PropertyValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Name of the variant, used in type-mismatch diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Null => "null",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Number(_) => "number",
            PropertyValue::String(_) => "string",
            PropertyValue::Array(_) => "array",
            PropertyValue::Object(_) => "object",
            PropertyValue::Secret(_) => "secret",
            PropertyValue::Computed => "computed",
            PropertyValue::Output(_) => "output",
        }
    }

    /// Returns true if this value or anything nested inside it is secret.
    #[must_use]
    pub fn contains_secrets(&self) -> bool {
        match self {
            PropertyValue::Secret(_) => true,
            PropertyValue::Output(out) => out.secret || out.element.contains_secrets(),
            PropertyValue::Array(items) => items.iter().any(PropertyValue::contains_secrets),
            PropertyValue::Object(map) => map.values().any(PropertyValue::contains_secrets),
            _ => false,
        }
    }

    /// Returns true if this value or anything nested inside it is unknown.
    #[must_use]
    pub fn contains_unknowns(&self) -> bool {
        match self {
            PropertyValue::Computed => true,
            PropertyValue::Output(out) => !out.known || out.element.contains_unknowns(),
            PropertyValue::Secret(inner) => inner.contains_unknowns(),
            PropertyValue::Array(items) => items.iter().any(PropertyValue::contains_unknowns),
            PropertyValue::Object(map) => map.values().any(PropertyValue::contains_unknowns),
            _ => false,
        }
    }

    /// Collects the output dependencies attached anywhere in this value.
    #[must_use]
    pub fn dependencies(&self) -> BTreeSet<String> {
        let mut deps = BTreeSet::new();
        self.collect_dependencies(&mut deps);
        deps
    }

    fn collect_dependencies(&self, deps: &mut BTreeSet<String>) {
        match self {
            PropertyValue::Output(out) => {
                deps.extend(out.dependencies.iter().cloned());
                out.element.collect_dependencies(deps);
            }
            PropertyValue::Secret(inner) => inner.collect_dependencies(deps),
            PropertyValue::Array(items) => items.iter().for_each(|v| v.collect_dependencies(deps)),
            PropertyValue::Object(map) => map.values().for_each(|v| v.collect_dependencies(deps)),
            _ => {}
        }
    }

    /// Removes secret wrappers and output envelopes, keeping the plain data.
    ///
    /// Unknown outputs become `Computed`. Used wherever only the shape and
    /// content of a value matter (diffing, hashing, marshaling inward).
    #[must_use]
    pub fn strip_markers(&self) -> PropertyValue {
        match self {
            PropertyValue::Secret(inner) => inner.strip_markers(),
            PropertyValue::Output(out) => {
                if out.known {
                    out.element.strip_markers()
                } else {
                    PropertyValue::Computed
                }
            }
            PropertyValue::Array(items) => {
                PropertyValue::Array(items.iter().map(PropertyValue::strip_markers).collect())
            }
            PropertyValue::Object(map) => PropertyValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.strip_markers()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Looks up the value at `path`, seeing through secret and output wrappers.
    ///
    /// Wildcard segments never match; expand them first.
    pub fn get_path(&self, path: &PropertyPath) -> Option<&PropertyValue> {
        let mut current = self;
        for segment in path.segments() {
            current = current.unwrap_markers();
            current = match (segment, current) {
                (PathSegment::Key(key), PropertyValue::Object(map)) => map.get(key)?,
                (PathSegment::Index(i), PropertyValue::Array(items)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }

    fn unwrap_markers(&self) -> &PropertyValue {
        match self {
            PropertyValue::Secret(inner) => inner.unwrap_markers(),
            PropertyValue::Output(out) if out.known => out.element.unwrap_markers(),
            other => other,
        }
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => PropertyValue::Null,
            serde_json::Value::Bool(b) => PropertyValue::Bool(b),
            serde_json::Value::Number(n) => PropertyValue::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => PropertyValue::String(s),
            serde_json::Value::Array(items) => {
                PropertyValue::Array(items.into_iter().map(PropertyValue::from).collect())
            }
            serde_json::Value::Object(map) => PropertyValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, PropertyValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::Number(n)
    }
}

impl From<PropertyMap> for PropertyValue {
    fn from(map: PropertyMap) -> Self {
        PropertyValue::Object(map)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(items: Vec<PropertyValue>) -> Self {
        PropertyValue::Array(items)
    }
}
