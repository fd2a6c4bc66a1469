//! Recovering inputs from a resource's outputs.
//!
//! After a refresh the engine needs inputs that reproduce the observed state;
//! after an import it needs inputs for a resource it has never seen. Both
//! start from the outputs and keep only settable attributes.

use crate::ConvertResult;
use crate::inward::value_to_foreign;
use crate::transform::apply_at;
use tether_schema::{Field, ResourceSchema, SchemaId, SchemaKind, SchemaNode};
use tether_types::{ForeignValue, PropertyMap, PropertyPath, PropertyValue};
use tracing::debug;

/// Why inputs are being extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Previous inputs exist and are preferred where they still describe the state.
    Refresh,
    /// No previous inputs; optional zero and default values are pruned.
    Import,
}

/// Builds inputs from `outputs`. Output-only attributes are never inputs.
///
/// In [`ExtractMode::Refresh`], an old input is kept in place of the output
/// when running the attribute's state functions over it yields the observed
/// value. This keeps an untransformed input from being replaced by its
/// transformed form, which would then be transformed a second time.
pub fn extract_inputs_from_outputs(
    schema: &ResourceSchema,
    outputs: &PropertyMap,
    old_inputs: Option<&PropertyMap>,
    mode: ExtractMode,
) -> ConvertResult<PropertyMap> {
    let mut inputs = PropertyMap::new();
    for field in schema.fields() {
        let node = schema.node(field.node);
        if node.is_output_only() {
            continue;
        }
        let Some(value) = outputs.get(&field.destination_name) else {
            continue;
        };
        let path = PropertyPath::root(field.destination_name.as_str());

        let extracted = match mode {
            ExtractMode::Refresh => {
                let old = old_inputs.and_then(|old| old.get(&field.destination_name));
                let keep_old = match old {
                    Some(old) => describes_state(schema, field.node, old, value, &path),
                    None => false,
                };
                match old {
                    Some(old) if keep_old => Some(old.clone()),
                    _ if value.is_null() => None,
                    _ => Some(value.clone()),
                }
            }
            ExtractMode::Import => prune(schema, field.node, value),
        };
        if let Some(extracted) = extracted {
            inputs.insert(field.destination_name.clone(), extracted);
        }
    }
    Ok(inputs)
}

/// True when `old`, transformed by the attribute's state functions, is the
/// observed `value`.
///
/// Old inputs written against an earlier schema may no longer convert; they
/// describe nothing and the observed value is used instead.
fn describes_state(
    schema: &ResourceSchema,
    id: SchemaId,
    old: &PropertyValue,
    value: &PropertyValue,
    path: &PropertyPath,
) -> bool {
    let converted = value_to_foreign(schema, id, old, path)
        .and_then(|old| Ok((old, value_to_foreign(schema, id, value, path)?)));
    match converted {
        Ok((old, observed)) => !old.is_null() && apply_at(schema, id, &old) == observed,
        Err(err) => {
            debug!(path = %path, error = %err, "Old input no longer converts; using observed value");
            false
        }
    }
}

/// Reports whether a value carries no information: null, false, zero, the
/// empty string, or an empty collection.
#[must_use]
pub fn is_zero_value(value: &PropertyValue) -> bool {
    match value {
        PropertyValue::Null => true,
        PropertyValue::Bool(b) => !b,
        PropertyValue::Number(n) => *n == 0.0,
        PropertyValue::String(s) => s.is_empty(),
        PropertyValue::Array(items) => items.is_empty(),
        PropertyValue::Object(map) => map.is_empty(),
        PropertyValue::Secret(inner) => is_zero_value(inner),
        PropertyValue::Output(out) => out.known && is_zero_value(&out.element),
        PropertyValue::Computed => false,
    }
}

fn prune(schema: &ResourceSchema, id: SchemaId, value: &PropertyValue) -> Option<PropertyValue> {
    match value {
        PropertyValue::Secret(inner) => return prune(schema, id, inner).map(PropertyValue::secret),
        PropertyValue::Output(out) if out.known => return prune(schema, id, &out.element),
        _ => {}
    }
    let node = schema.node(id);
    if value.is_null() || node.is_output_only() {
        return None;
    }
    if !node.required && !node.always_include_in_import && (is_zero_value(value) || is_default(node, value)) {
        return None;
    }

    let pruned = match (&node.kind, value) {
        (SchemaKind::Object(fields), PropertyValue::Object(map)) => PropertyValue::Object(prune_fields(schema, fields, map)),
        (SchemaKind::List(elem) | SchemaKind::Set(elem), PropertyValue::Object(map)) if node.collapse_singleton => {
            prune_element(schema, *elem, &PropertyValue::Object(map.clone()))
        }
        (SchemaKind::List(elem) | SchemaKind::Set(elem), PropertyValue::Array(items)) => {
            PropertyValue::Array(items.iter().map(|item| prune_element(schema, *elem, item)).collect())
        }
        _ => value.clone(),
    };
    Some(pruned)
}

/// Collection elements are always kept; only the fields of block elements
/// are pruned.
fn prune_element(schema: &ResourceSchema, elem: SchemaId, item: &PropertyValue) -> PropertyValue {
    match (&schema.node(elem).kind, item) {
        (SchemaKind::Object(fields), PropertyValue::Object(map)) => PropertyValue::Object(prune_fields(schema, fields, map)),
        _ => item.clone(),
    }
}

fn prune_fields(schema: &ResourceSchema, fields: &[Field], map: &PropertyMap) -> PropertyMap {
    fields
        .iter()
        .filter_map(|field| {
            let value = map.get(&field.destination_name)?;
            prune(schema, field.node, value).map(|pruned| (field.destination_name.clone(), pruned))
        })
        .collect()
}

/// Compares a value against the node's literal default.
fn is_default(node: &SchemaNode, value: &PropertyValue) -> bool {
    let Some(default) = &node.default.value else {
        return false;
    };
    match (default, value) {
        (ForeignValue::Bool(a), PropertyValue::Bool(b)) => a == b,
        (ForeignValue::Int(a), PropertyValue::Number(b)) => *a as f64 == *b,
        (ForeignValue::Float(a), PropertyValue::Number(b)) => a == b,
        (ForeignValue::String(a), PropertyValue::String(b)) => a == b,
        _ => false,
    }
}
