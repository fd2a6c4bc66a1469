//! Persisted state codec.
//!
//! A [`RawState`] holds untyped JSON. Decoding types it by the schema: arrays
//! under set nodes become sets, integral numbers under int nodes become ints,
//! and the unknown sentinel string becomes [`ForeignValue::Unknown`].

use crate::{ConvertError, ConvertResult};
use serde_json::Value;
use std::collections::BTreeMap;
use tether_schema::{ResourceSchema, SchemaId, SchemaKind};
use tether_types::{ForeignValue, PropertyPath, RawState, UNKNOWN_SENTINEL};
use tracing::warn;

/// Decodes persisted state written under the schema's current version.
///
/// Older state must go through the upgrade pipeline first; a version
/// mismatch is reported as [`ConvertError::StaleState`]. Attributes the
/// schema no longer declares are dropped.
pub fn decode_raw_state(schema: &ResourceSchema, raw: &RawState) -> ConvertResult<ForeignValue> {
    if raw.version != schema.version {
        return Err(ConvertError::StaleState {
            found: raw.version,
            expected: schema.version,
        });
    }
    if !raw.state.is_object() {
        return Err(ConvertError::InvalidState(format!(
            "{}: state must be an object, found {}",
            schema.token,
            json_type(&raw.state)
        )));
    }
    Decoder { schema }.decode(schema.root, &raw.state, &PropertyPath::new())
}

/// Encodes foreign state for persistence under the schema's current version.
#[must_use]
pub fn encode_raw_state(schema: &ResourceSchema, state: &ForeignValue) -> RawState {
    RawState::new(schema.version, state.to_json())
}

struct Decoder<'a> {
    schema: &'a ResourceSchema,
}

impl Decoder<'_> {
    fn decode(&self, id: SchemaId, value: &Value, path: &PropertyPath) -> ConvertResult<ForeignValue> {
        match value {
            Value::Null => return Ok(ForeignValue::Null),
            Value::String(s) if s == UNKNOWN_SENTINEL => return Ok(ForeignValue::Unknown),
            _ => {}
        }

        let node = self.schema.node(id);
        let decoded = match (&node.kind, value) {
            (SchemaKind::Bool, Value::Bool(b)) => ForeignValue::Bool(*b),
            (SchemaKind::Int, Value::Number(n)) => match n.as_i64() {
                Some(i) => ForeignValue::Int(i),
                None => ForeignValue::Float(n.as_f64().unwrap_or_default()),
            },
            (SchemaKind::Float, Value::Number(n)) => ForeignValue::Float(n.as_f64().unwrap_or_default()),
            (SchemaKind::String, Value::Bool(b)) => ForeignValue::String(b.to_string()),
            (SchemaKind::String, Value::Number(n)) => ForeignValue::String(n.to_string()),
            // Strings under bool or number nodes are kept; the marshaler
            // coerces them on the way out.
            (
                SchemaKind::Bool | SchemaKind::Int | SchemaKind::Float | SchemaKind::String,
                Value::String(s),
            ) => ForeignValue::String(s.clone()),
            (SchemaKind::List(elem), Value::Array(items)) => ForeignValue::List(self.elements(*elem, items, path)?),
            (SchemaKind::Set(elem), Value::Array(items)) => ForeignValue::Set(self.elements(*elem, items, path)?),
            (SchemaKind::Map(elem), Value::Object(map)) => {
                let mut out = BTreeMap::new();
                for (key, item) in map {
                    out.insert(key.clone(), self.decode(*elem, item, &path.key(key.as_str()))?);
                }
                ForeignValue::Map(out)
            }
            (SchemaKind::Object(_), Value::Object(map)) => {
                let mut out = BTreeMap::new();
                for (key, item) in map {
                    let child = path.key(key.as_str());
                    match node.field(key) {
                        Some(field) => {
                            out.insert(key.clone(), self.decode(field.node, item, &child)?);
                        }
                        None => warn!(
                            token = %self.schema.token,
                            path = %child,
                            "Dropping state attribute missing from schema"
                        ),
                    }
                }
                ForeignValue::Map(out)
            }
            (kind, other) => {
                return Err(ConvertError::TypeMismatch {
                    path: path.clone(),
                    expected: kind.name(),
                    found: json_type(other),
                });
            }
        };
        Ok(decoded)
    }

    fn elements(&self, elem: SchemaId, items: &[Value], path: &PropertyPath) -> ConvertResult<Vec<ForeignValue>> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.decode(elem, item, &path.index(i)))
            .collect()
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
