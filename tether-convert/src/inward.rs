//! Destination property values back to foreign values.

use crate::{ConvertError, ConvertResult};
use std::collections::BTreeMap;
use tether_schema::{Field, ResourceSchema, SchemaId, SchemaKind};
use tether_types::{ForeignValue, PropertyMap, PropertyPath, PropertyValue};
use tracing::debug;

/// Options for [`to_foreign`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputOptions<'a> {
    /// Fill absent optional attributes from their declared defaults.
    pub apply_defaults: bool,
    /// Prior foreign state of the resource. A top-level default already
    /// recorded there is reused instead of being resolved again.
    pub prior: Option<&'a ForeignValue>,
}

impl<'a> InputOptions<'a> {
    #[must_use]
    pub fn new(apply_defaults: bool) -> Self {
        Self {
            apply_defaults,
            prior: None,
        }
    }

    #[must_use]
    pub fn with_prior(mut self, prior: &'a ForeignValue) -> Self {
        self.prior = Some(prior);
        self
    }
}

impl Default for InputOptions<'_> {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Converts destination properties (inputs or state) into the foreign
/// representation of the whole resource.
///
/// Keys starting with `__` are reserved for the engine and skipped. Any other
/// key without a matching attribute is an [`ConvertError::UnknownProperty`].
/// Null attributes are omitted from the result. Absent optional attributes
/// take the prior value from [`InputOptions::prior`] if there is one, and
/// their declared default otherwise.
pub fn to_foreign(
    schema: &ResourceSchema,
    props: &PropertyMap,
    options: &InputOptions<'_>,
) -> ConvertResult<ForeignValue> {
    let converter = Converter { schema, options };
    let olds = options.prior.and_then(ForeignValue::as_map);
    let map = converter.object(schema.fields(), props, &PropertyPath::new(), olds)?;
    Ok(ForeignValue::Map(map))
}

/// Converts a single destination value at `node`. Defaults are not applied.
pub fn value_to_foreign(
    schema: &ResourceSchema,
    node: SchemaId,
    value: &PropertyValue,
    path: &PropertyPath,
) -> ConvertResult<ForeignValue> {
    let options = InputOptions::new(false);
    Converter {
        schema,
        options: &options,
    }
    .convert(node, value, path)
}

struct Converter<'a> {
    schema: &'a ResourceSchema,
    options: &'a InputOptions<'a>,
}

impl Converter<'_> {
    fn convert(&self, id: SchemaId, value: &PropertyValue, path: &PropertyPath) -> ConvertResult<ForeignValue> {
        match value {
            PropertyValue::Secret(inner) => return self.convert(id, inner, path),
            PropertyValue::Output(out) if out.known => return self.convert(id, &out.element, path),
            PropertyValue::Output(_) | PropertyValue::Computed => return Ok(ForeignValue::Unknown),
            _ => {}
        }

        let node = self.schema.node(id);
        let mismatch = || ConvertError::TypeMismatch {
            path: path.clone(),
            expected: node.kind.name(),
            found: value.type_name(),
        };

        let converted = match (&node.kind, value) {
            (SchemaKind::List(elem) | SchemaKind::Set(elem), _) if node.collapse_singleton => {
                let items = match value {
                    PropertyValue::Null => Vec::new(),
                    PropertyValue::Array(items) if !self.is_sequence(*elem) => self.elements(*elem, items, path)?,
                    bare => vec![self.convert(*elem, bare, path)?],
                };
                self.wrap(&node.kind, items)
            }
            (_, PropertyValue::Null) => ForeignValue::Null,
            (SchemaKind::List(elem) | SchemaKind::Set(elem), PropertyValue::Array(items)) => {
                let items = self.elements(*elem, items, path)?;
                self.wrap(&node.kind, items)
            }
            (SchemaKind::Map(elem), PropertyValue::Object(map)) => {
                let mut out = BTreeMap::new();
                for (key, item) in map {
                    let converted = self.convert(*elem, item, &path.key(key.as_str()))?;
                    if !converted.is_null() {
                        out.insert(key.clone(), converted);
                    }
                }
                ForeignValue::Map(out)
            }
            (SchemaKind::Object(fields), PropertyValue::Object(map)) => {
                ForeignValue::Map(self.object(fields, map, path, None)?)
            }
            (SchemaKind::Bool, PropertyValue::Bool(b)) => ForeignValue::Bool(*b),
            (SchemaKind::Int, PropertyValue::Number(n)) => {
                if n.is_finite() && n.fract() == 0.0 {
                    ForeignValue::Int(*n as i64)
                } else {
                    return Err(mismatch());
                }
            }
            (SchemaKind::Float, PropertyValue::Number(n)) => ForeignValue::Float(*n),
            (SchemaKind::String, PropertyValue::String(s)) => ForeignValue::String(s.clone()),
            (SchemaKind::String, PropertyValue::Number(n)) => ForeignValue::String(n.to_string()),
            (SchemaKind::String, PropertyValue::Bool(b)) => ForeignValue::String(b.to_string()),
            _ => return Err(mismatch()),
        };
        Ok(converted)
    }

    fn is_sequence(&self, id: SchemaId) -> bool {
        matches!(self.schema.node(id).kind, SchemaKind::List(_) | SchemaKind::Set(_))
    }

    fn elements(&self, elem: SchemaId, items: &[PropertyValue], path: &PropertyPath) -> ConvertResult<Vec<ForeignValue>> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.convert(elem, item, &path.index(i)))
            .collect()
    }

    /// Builds the foreign collection for a list or set node. Sets drop exact
    /// duplicates, keeping the first occurrence.
    fn wrap(&self, kind: &SchemaKind, items: Vec<ForeignValue>) -> ForeignValue {
        match kind {
            SchemaKind::Set(_) => {
                let mut unique: Vec<ForeignValue> = Vec::with_capacity(items.len());
                for item in items {
                    if !unique.contains(&item) {
                        unique.push(item);
                    }
                }
                ForeignValue::Set(unique)
            }
            _ => ForeignValue::List(items),
        }
    }

    fn object(
        &self,
        fields: &[Field],
        props: &PropertyMap,
        path: &PropertyPath,
        olds: Option<&BTreeMap<String, ForeignValue>>,
    ) -> ConvertResult<BTreeMap<String, ForeignValue>> {
        let mut out = BTreeMap::new();
        for (key, value) in props {
            if key.starts_with("__") {
                continue;
            }
            let child = path.key(key.as_str());
            let Some(field) = fields.iter().find(|f| f.destination_name == *key) else {
                return Err(ConvertError::UnknownProperty { path: child });
            };
            let converted = self.convert(field.node, value, &child)?;
            if !converted.is_null() {
                out.insert(field.foreign_name.clone(), converted);
            }
        }

        if self.options.apply_defaults {
            for field in fields {
                if out.contains_key(&field.foreign_name) {
                    continue;
                }
                let node = self.schema.node(field.node);
                if !node.optional || node.default.is_empty() {
                    continue;
                }
                let child = path.key(field.destination_name.as_str());
                // A default resolved for an earlier operation stays put.
                if let Some(old) = olds
                    .and_then(|olds| olds.get(&field.foreign_name))
                    .filter(|old| !old.is_null() && !old.is_unknown())
                {
                    debug!(path = %child, "Reused prior default value");
                    out.insert(field.foreign_name.clone(), old.clone());
                    continue;
                }
                let resolved = node
                    .default
                    .resolve(&node.kind)
                    .map_err(|message| ConvertError::Default {
                        path: child.clone(),
                        message,
                    })?;
                if let Some(value) = resolved {
                    debug!(path = %child, "Applied default value");
                    out.insert(field.foreign_name.clone(), value);
                }
            }
        }
        Ok(out)
    }
}
