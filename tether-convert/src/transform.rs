use tether_schema::{ResourceSchema, SchemaId, SchemaKind};
use tether_types::ForeignValue;

/// Runs every state function declared in the schema over `value`.
///
/// Children are transformed before their parent. Null and unknown values are
/// passed through untouched.
#[must_use]
pub fn apply_state_funcs(schema: &ResourceSchema, value: &ForeignValue) -> ForeignValue {
    apply_at(schema, schema.root, value)
}

pub(crate) fn apply_at(schema: &ResourceSchema, id: SchemaId, value: &ForeignValue) -> ForeignValue {
    if value.is_null() || value.is_unknown() {
        return value.clone();
    }
    let node = schema.node(id);
    let inner = match (&node.kind, value) {
        (SchemaKind::List(elem) | SchemaKind::Set(elem), ForeignValue::List(items)) => {
            ForeignValue::List(items.iter().map(|v| apply_at(schema, *elem, v)).collect())
        }
        (SchemaKind::List(elem) | SchemaKind::Set(elem), ForeignValue::Set(items)) => {
            ForeignValue::Set(items.iter().map(|v| apply_at(schema, *elem, v)).collect())
        }
        (SchemaKind::Map(elem), ForeignValue::Map(map)) => ForeignValue::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), apply_at(schema, *elem, v)))
                .collect(),
        ),
        (SchemaKind::Object(_), ForeignValue::Map(map)) => ForeignValue::Map(
            map.iter()
                .map(|(k, v)| {
                    let transformed = match node.field(k) {
                        Some(field) => apply_at(schema, field.node, v),
                        None => v.clone(),
                    };
                    (k.clone(), transformed)
                })
                .collect(),
        ),
        _ => value.clone(),
    };
    match &node.state_func {
        Some(func) => func.apply(&inner),
        None => inner,
    }
}
