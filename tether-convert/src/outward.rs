//! Foreign values to destination property values.

use crate::{ConvertError, ConvertResult};
use std::collections::BTreeMap;
use tether_schema::{ResourceSchema, SchemaId, SchemaKind, SchemaNode};
use tether_setid::SetIdentityResolver;
use tether_types::{ForeignValue, PropertyMap, PropertyPath, PropertyValue};
use tracing::debug;

/// Which provider call produced the state being converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOrigin {
    /// Read back from the provider (refresh, import, data source lookups).
    Read,
    /// Returned by the provider's create call.
    CreateResponse,
    /// Planned state computed ahead of an operation.
    Plan,
}

/// Context for [`to_destination`].
#[derive(Debug, Clone, Copy)]
pub struct OutputContext<'a> {
    pub origin: StateOrigin,
    /// The inputs the user supplied, keyed by destination name.
    pub inputs: Option<&'a PropertyMap>,
    pub supports_secrets: bool,
}

impl<'a> OutputContext<'a> {
    #[must_use]
    pub fn new(origin: StateOrigin) -> Self {
        Self {
            origin,
            inputs: None,
            supports_secrets: true,
        }
    }

    #[must_use]
    pub fn with_inputs(mut self, inputs: &'a PropertyMap) -> Self {
        self.inputs = Some(inputs);
        self
    }

    #[must_use]
    pub fn with_secrets(mut self, supports_secrets: bool) -> Self {
        self.supports_secrets = supports_secrets;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    TopLevel { set_by_user: bool },
    Nested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmptyCollection {
    Null,
    Empty,
}

/// How an empty or null foreign collection is presented.
///
/// | position  | origin          | set by user | foreign value | result |
/// |-----------|-----------------|-------------|---------------|--------|
/// | top-level | create response | any         | empty         | empty  |
/// | top-level | any             | yes         | empty or null | empty  |
/// | top-level | any             | no          | empty or null | null   |
/// | nested    | any             | any         | empty or null | empty  |
fn empty_collection(position: Position, origin: StateOrigin, foreign_is_null: bool) -> EmptyCollection {
    match (position, origin, foreign_is_null) {
        (Position::Nested, _, _) => EmptyCollection::Empty,
        (Position::TopLevel { .. }, StateOrigin::CreateResponse, false) => EmptyCollection::Empty,
        (Position::TopLevel { set_by_user: true }, _, _) => EmptyCollection::Empty,
        (Position::TopLevel { set_by_user: false }, _, _) => EmptyCollection::Null,
    }
}

/// Converts a resource's foreign state into destination properties.
///
/// Every schema field appears in the result; absent fields are `Null`
/// (or an empty collection where the table above says so).
pub fn to_destination(
    schema: &ResourceSchema,
    state: &ForeignValue,
    ctx: &OutputContext<'_>,
) -> ConvertResult<PropertyMap> {
    let empty = BTreeMap::new();
    let map = match state {
        ForeignValue::Map(map) => map,
        ForeignValue::Null => &empty,
        other => {
            return Err(ConvertError::TypeMismatch {
                path: PropertyPath::new(),
                expected: "object",
                found: other.type_name(),
            });
        }
    };

    let converter = Converter { schema, ctx };
    let mut out = PropertyMap::new();
    for field in schema.fields() {
        let value = map.get(&field.foreign_name).unwrap_or(&ForeignValue::Null);
        let path = PropertyPath::root(field.destination_name.as_str());
        let set_by_user = ctx
            .inputs
            .and_then(|inputs| inputs.get(&field.destination_name))
            .is_some_and(|v| !v.is_null());
        let converted = converter.convert(field.node, value, &path, Position::TopLevel { set_by_user })?;
        out.insert(field.destination_name.clone(), converted);
    }
    Ok(out)
}

/// Converts a single value at `node`, treating it as nested.
pub fn value_to_destination(
    schema: &ResourceSchema,
    node: SchemaId,
    value: &ForeignValue,
    ctx: &OutputContext<'_>,
) -> ConvertResult<PropertyValue> {
    Converter { schema, ctx }.convert(node, value, &PropertyPath::new(), Position::Nested)
}

struct Converter<'a, 'c> {
    schema: &'a ResourceSchema,
    ctx: &'a OutputContext<'c>,
}

impl Converter<'_, '_> {
    fn convert(
        &self,
        id: SchemaId,
        value: &ForeignValue,
        path: &PropertyPath,
        position: Position,
    ) -> ConvertResult<PropertyValue> {
        let node = self.schema.node(id);
        if value.is_unknown() {
            return Ok(PropertyValue::Computed);
        }

        let converted = match (&node.kind, value) {
            (SchemaKind::List(elem) | SchemaKind::Set(elem), _) if node.collapse_singleton => {
                self.collapse(*elem, value, path)?
            }
            (SchemaKind::List(_) | SchemaKind::Set(_) | SchemaKind::Map(_), ForeignValue::Null) => {
                self.empty(node, position, true)
            }
            (
                SchemaKind::List(elem) | SchemaKind::Set(elem),
                ForeignValue::List(items) | ForeignValue::Set(items),
            ) => {
                if items.is_empty() {
                    self.empty(node, position, false)
                } else {
                    let order: Vec<usize> = match node.kind {
                        SchemaKind::Set(_) => SetIdentityResolver::new(self.schema, id).canonical_order(items),
                        _ => (0..items.len()).collect(),
                    };
                    let converted = order
                        .into_iter()
                        .enumerate()
                        .map(|(i, src)| self.convert(*elem, &items[src], &path.index(i), Position::Nested))
                        .collect::<ConvertResult<Vec<_>>>()?;
                    PropertyValue::Array(converted)
                }
            }
            (SchemaKind::Map(elem), ForeignValue::Map(map)) => {
                if map.is_empty() {
                    self.empty(node, position, false)
                } else {
                    let mut out = PropertyMap::new();
                    for (key, item) in map {
                        let converted = self.convert(*elem, item, &path.key(key.as_str()), Position::Nested)?;
                        out.insert(key.clone(), converted);
                    }
                    PropertyValue::Object(out)
                }
            }
            (SchemaKind::Object(fields), ForeignValue::Map(map)) => {
                let mut out = PropertyMap::new();
                for field in fields {
                    let item = map.get(&field.foreign_name).unwrap_or(&ForeignValue::Null);
                    let child = path.key(field.destination_name.as_str());
                    out.insert(
                        field.destination_name.clone(),
                        self.convert(field.node, item, &child, Position::Nested)?,
                    );
                }
                PropertyValue::Object(out)
            }
            (SchemaKind::Object(_), ForeignValue::Null) => PropertyValue::Null,
            (SchemaKind::Bool | SchemaKind::Int | SchemaKind::Float | SchemaKind::String, _) => {
                scalar(&node.kind, value, path)?
            }
            (kind, other) => {
                return Err(ConvertError::TypeMismatch {
                    path: path.clone(),
                    expected: kind.name(),
                    found: other.type_name(),
                });
            }
        };

        if node.sensitive && self.ctx.supports_secrets && !converted.is_null() {
            return Ok(PropertyValue::secret(converted));
        }
        Ok(converted)
    }

    fn empty(&self, node: &SchemaNode, position: Position, foreign_is_null: bool) -> PropertyValue {
        match empty_collection(position, self.ctx.origin, foreign_is_null) {
            EmptyCollection::Null => PropertyValue::Null,
            EmptyCollection::Empty => match node.kind {
                SchemaKind::Map(_) => PropertyValue::Object(PropertyMap::new()),
                _ => PropertyValue::Array(Vec::new()),
            },
        }
    }

    /// Unwraps a singleton collection: no element is null, one element is
    /// the element itself, more is an error.
    fn collapse(&self, elem: SchemaId, value: &ForeignValue, path: &PropertyPath) -> ConvertResult<PropertyValue> {
        let items = match value {
            ForeignValue::Null => &[][..],
            ForeignValue::List(items) | ForeignValue::Set(items) => items.as_slice(),
            other => {
                return Err(ConvertError::TypeMismatch {
                    path: path.clone(),
                    expected: "list",
                    found: other.type_name(),
                });
            }
        };
        match items {
            [] => Ok(PropertyValue::Null),
            [only] => self.convert(elem, only, path, Position::Nested),
            _ => Err(ConvertError::TooManyElements {
                path: path.clone(),
                count: items.len(),
            }),
        }
    }
}

fn scalar(kind: &SchemaKind, value: &ForeignValue, path: &PropertyPath) -> ConvertResult<PropertyValue> {
    let mismatch = || ConvertError::TypeMismatch {
        path: path.clone(),
        expected: kind.name(),
        found: value.type_name(),
    };
    let converted = match (kind, value) {
        (_, ForeignValue::Null) => PropertyValue::Null,
        (SchemaKind::Bool, ForeignValue::Bool(b)) => PropertyValue::Bool(*b),
        (SchemaKind::Int | SchemaKind::Float, ForeignValue::Int(i)) => PropertyValue::Number(*i as f64),
        (SchemaKind::Int | SchemaKind::Float, ForeignValue::Float(f)) => PropertyValue::Number(*f),
        (SchemaKind::String, ForeignValue::String(s)) => PropertyValue::String(s.clone()),
        (SchemaKind::Bool | SchemaKind::Int | SchemaKind::Float, ForeignValue::String(s)) => {
            debug!(path = %path, "Coercing string state value to {}", kind.name());
            coerce_string(kind, s).ok_or_else(mismatch)?
        }
        _ => return Err(mismatch()),
    };
    Ok(converted)
}

/// Parses a string written where the schema expects a bool or number.
/// An empty string stands for an unset value.
fn coerce_string(kind: &SchemaKind, s: &str) -> Option<PropertyValue> {
    if s.is_empty() {
        return Some(PropertyValue::Null);
    }
    match kind {
        SchemaKind::Bool => match s {
            "true" | "1" => Some(PropertyValue::Bool(true)),
            "false" | "0" => Some(PropertyValue::Bool(false)),
            _ => None,
        },
        _ => s.parse::<f64>().ok().map(PropertyValue::Number),
    }
}
