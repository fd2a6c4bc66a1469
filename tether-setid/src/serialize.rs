//! Canonical byte serialization of foreign values, as the foreign provider
//! writes it before hashing a set element.
//!
//! The format must match the provider byte for byte; otherwise identities
//! computed here drift from the ones the provider computes internally.
//!
//! | value            | written as                                   |
//! |------------------|----------------------------------------------|
//! | null             | `;`                                          |
//! | bool             | `1;` / `0;`                                  |
//! | int / float      | decimal (`%g` style for floats), then `;`    |
//! | string           | raw bytes, then `;`                          |
//! | list             | `(` members `);`                             |
//! | set              | `{` members in identity order `};`           |
//! | map              | `[` `k:v;` for sorted non-null keys `];`     |
//! | block (object)   | `k:` value for sorted settable fields        |
//!
//! A block appearing as a collection member is wrapped as `<` block `>;`.

use crate::hash_string;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tether_schema::{SchemaArena, SchemaId, SchemaKind};
use tether_types::{ForeignValue, UNKNOWN_SENTINEL};
use tracing::warn;

/// Serializes a set element the way the default identity function sees it.
///
/// Blocks are written without the member wrapper; everything else as a value.
#[must_use]
pub fn serialize_for_hash(arena: &SchemaArena, element: SchemaId, value: &ForeignValue) -> String {
    let mut buf = String::new();
    match arena[element].kind {
        SchemaKind::Object(_) => serialize_block(arena, element, value, &mut buf),
        _ => serialize_value(arena, element, value, &mut buf),
    }
    buf
}

/// Writes one value followed by its terminator.
pub fn serialize_value(arena: &SchemaArena, node: SchemaId, value: &ForeignValue, buf: &mut String) {
    if value.is_null() {
        buf.push(';');
        return;
    }
    match (&arena[node].kind, value) {
        (_, ForeignValue::Unknown) => buf.push_str(UNKNOWN_SENTINEL),
        (SchemaKind::Object(_), _) => {
            buf.push('<');
            serialize_block(arena, node, value, buf);
            buf.push('>');
        }
        (SchemaKind::List(elem), _) => {
            buf.push('(');
            for item in value.as_elements().unwrap_or_default() {
                serialize_member(arena, *elem, item, buf);
            }
            buf.push(')');
        }
        (SchemaKind::Set(elem), _) => {
            buf.push('{');
            let items = value.as_elements().unwrap_or_default();
            for item in ordered_members(arena, node, *elem, items) {
                serialize_member(arena, *elem, item, buf);
            }
            buf.push('}');
        }
        (SchemaKind::Map(_), ForeignValue::Map(map)) => {
            buf.push('[');
            for (key, item) in map {
                if item.is_null() {
                    continue;
                }
                buf.push_str(key);
                buf.push(':');
                write_scalar(item, buf);
                buf.push(';');
            }
            buf.push(']');
        }
        (_, scalar) => write_scalar(scalar, buf),
    }
    buf.push(';');
}

/// Writes the settable fields of a block, sorted by foreign name.
///
/// Computed-only fields are skipped: their value is unknown at plan time and
/// must not influence identity.
pub fn serialize_block(arena: &SchemaArena, node: SchemaId, value: &ForeignValue, buf: &mut String) {
    let Some(map) = value.as_map() else {
        return;
    };
    for field in arena[node].fields() {
        let child = &arena[field.node];
        if !(child.required || child.optional) {
            continue;
        }
        buf.push_str(&field.foreign_name);
        buf.push(':');
        let inner = map.get(&field.foreign_name).unwrap_or(&ForeignValue::Null);
        serialize_value(arena, field.node, inner, buf);
    }
}

fn serialize_member(arena: &SchemaArena, elem: SchemaId, value: &ForeignValue, buf: &mut String) {
    if matches!(arena[elem].kind, SchemaKind::Object(_)) {
        buf.push('<');
        serialize_block(arena, elem, value, buf);
        buf.push_str(">;");
    } else {
        serialize_value(arena, elem, value, buf);
    }
}

/// Nested set members are written in the provider's listing order: sorted by
/// the decimal string of each member's hash. A hash function that panics is
/// replaced by the default identity.
fn ordered_members<'v>(
    arena: &SchemaArena,
    set: SchemaId,
    elem: SchemaId,
    items: &'v [ForeignValue],
) -> Vec<&'v ForeignValue> {
    let mut keyed: Vec<(String, &ForeignValue)> = items
        .iter()
        .map(|item| {
            let custom = arena[set].set_hash.as_ref().and_then(|hash| {
                catch_unwind(AssertUnwindSafe(|| hash.hash(item)))
                    .inspect_err(|_| warn!("Nested set hash function panicked, falling back to default identity"))
                    .ok()
            });
            let code = custom.unwrap_or_else(|| hash_string(&serialize_for_hash(arena, elem, item)));
            (code.to_string(), item)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.into_iter().map(|(_, item)| item).collect()
}

fn write_scalar(value: &ForeignValue, buf: &mut String) {
    match value {
        ForeignValue::Bool(true) => buf.push('1'),
        ForeignValue::Bool(false) => buf.push('0'),
        ForeignValue::Int(i) => buf.push_str(&i.to_string()),
        ForeignValue::Float(f) => buf.push_str(&format_float(*f)),
        ForeignValue::String(s) => buf.push_str(s),
        ForeignValue::Unknown => buf.push_str(UNKNOWN_SENTINEL),
        ForeignValue::Null | ForeignValue::List(_) | ForeignValue::Set(_) | ForeignValue::Map(_) => {}
    }
}

/// Shortest round-trip float formatting in `%g` style: exponent notation when
/// the decimal exponent is below -4 or at least 6, plain digits otherwise.
#[must_use]
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    let sci = format!("{f:e}");
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or_default();
    if f != 0.0 && (exp < -4 || exp >= 6) {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    } else {
        format!("{f}")
    }
}
