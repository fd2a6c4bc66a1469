use crate::ignore::IgnorePath;
use crate::record::{DiffKind, DiffRecord, DiffResult};
use crate::{DiffError, Result};
use std::collections::BTreeSet;
use tether_convert::value_to_foreign;
use tether_schema::{Field, ResourceSchema, SchemaId, SchemaKind};
use tether_setid::SetIdentityResolver;
use tether_types::{ForeignValue, PropertyMap, PropertyPath, PropertyValue};
use tracing::debug;

static NULL: PropertyValue = PropertyValue::Null;
static COMPUTED: PropertyValue = PropertyValue::Computed;

/// Key of the synthetic record added when a replacement is forced.
const META_KEY: &str = "__meta";

/// Options for [`diff`].
#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    pub ignore_paths: Vec<IgnorePath>,
    /// `Some(true)` forces a replacement, `Some(false)` turns every replacing
    /// change into an in-place one.
    pub replace_override: Option<bool>,
}

impl DiffOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ignore(mut self, path: IgnorePath) -> Self {
        self.ignore_paths.push(path);
        self
    }

    #[must_use]
    pub fn replace_override(mut self, replace: bool) -> Self {
        self.replace_override = Some(replace);
        self
    }
}

/// Compares prior and proposed properties of one resource.
///
/// Every top-level property present on either side gets at least one record;
/// unchanged ones get a single [`DiffKind::Same`] record. Keys starting with
/// `__` are skipped. Values that do not match the schema are an error.
pub fn diff(
    schema: &ResourceSchema,
    prior: &PropertyMap,
    proposed: &PropertyMap,
    options: &DiffOptions,
) -> Result<DiffResult> {
    let mut walker = Walker {
        schema,
        records: Vec::new(),
    };

    let keys: BTreeSet<&String> = prior
        .keys()
        .chain(proposed.keys())
        .filter(|key| !key.starts_with("__"))
        .collect();
    for key in keys {
        let path = PropertyPath::root(key.as_str());
        let Some(field) = schema.field_by_destination(key) else {
            return Err(DiffError::UnknownProperty { path });
        };
        let old = prior.get(key).unwrap_or(&NULL);
        let new = proposed.get(key).unwrap_or(&NULL);
        let before = walker.records.len();
        walker.walk(field.node, &path, old, new, schema.node(field.node).force_replace)?;
        if walker.records.len() == before {
            walker
                .records
                .push(DiffRecord::new(path, DiffKind::Same, old.clone(), new.clone()));
        }
    }

    let mut records = walker.records;
    let ignored: Vec<PropertyPath> = options
        .ignore_paths
        .iter()
        .flat_map(|pattern| pattern.expand(prior))
        .collect();
    for record in &mut records {
        if record.kind.is_change() && ignored.iter().any(|p| record.path.starts_with(p)) {
            debug!(token = %schema.token, path = %record.path, "Ignoring change");
            record.kind = DiffKind::Same;
        }
    }

    match options.replace_override {
        Some(true) if !records.iter().any(|r| r.kind.is_replace()) => {
            records.push(DiffRecord::new(
                PropertyPath::root(META_KEY),
                DiffKind::UpdateReplace,
                PropertyValue::Null,
                PropertyValue::Null,
            ));
        }
        Some(false) => {
            for record in &mut records {
                record.kind = record.kind.in_place();
            }
        }
        _ => {}
    }

    let result = DiffResult::from_records(records, schema.delete_before_replace);
    debug!(
        token = %schema.token,
        changes = result.changes().count(),
        replace = result.replace,
        "Computed diff"
    );
    Ok(result)
}

struct Walker<'a> {
    schema: &'a ResourceSchema,
    records: Vec<DiffRecord>,
}

impl<'a> Walker<'a> {
    fn walk(
        &mut self,
        id: SchemaId,
        path: &PropertyPath,
        old: &PropertyValue,
        new: &PropertyValue,
        force: bool,
    ) -> Result<()> {
        let schema = self.schema;
        let node = schema.node(id);
        let (plain_old, plain_new) = (plain(old), plain(new));

        // An unknown proposal is always a change, unless it replaces another
        // unknown.
        if matches!(plain_new, PropertyValue::Computed) {
            if !matches!(plain_old, PropertyValue::Computed) {
                self.push(path, DiffKind::Update, force, old, new);
            }
            return Ok(());
        }
        if matches!(plain_old, PropertyValue::Computed) {
            self.push(path, DiffKind::Update, force, old, new);
            return Ok(());
        }

        match (plain_old.is_null(), plain_new.is_null()) {
            (true, true) => return Ok(()),
            (true, false) => {
                self.check_shape(id, plain_new, path)?;
                let force = force || self.contains_force_replace(id);
                self.push(path, DiffKind::Add, force, old, new);
                return Ok(());
            }
            (false, true) => {
                self.check_shape(id, plain_old, path)?;
                let force = force || self.contains_force_replace(id);
                self.push(path, DiffKind::Delete, force, old, new);
                return Ok(());
            }
            (false, false) => {}
        }

        if node.collapse_singleton
            && let Some(elem) = node.element()
        {
            let force = force || schema.node(elem).force_replace;
            return self.walk(elem, path, old, new, force);
        }

        self.check_shape(id, plain_old, path)?;
        self.check_shape(id, plain_new, path)?;
        match (&node.kind, plain_old, plain_new) {
            (SchemaKind::List(elem), PropertyValue::Array(old_items), PropertyValue::Array(new_items)) => {
                let force = force || schema.node(*elem).force_replace;
                for i in 0..old_items.len().max(new_items.len()) {
                    let old_item = old_items.get(i).unwrap_or(&NULL);
                    let new_item = new_items.get(i).unwrap_or(&NULL);
                    self.walk(*elem, &path.index(i), old_item, new_item, force)?;
                }
            }
            (SchemaKind::Set(elem), PropertyValue::Array(old_items), PropertyValue::Array(new_items)) => {
                let force = force || schema.node(*elem).force_replace;
                self.walk_set(id, *elem, path, old_items, new_items, force)?;
            }
            (SchemaKind::Map(elem), PropertyValue::Object(old_map), PropertyValue::Object(new_map)) => {
                let force = force || schema.node(*elem).force_replace;
                let keys: BTreeSet<&String> = old_map.keys().chain(new_map.keys()).collect();
                for key in keys {
                    let old_item = old_map.get(key).unwrap_or(&NULL);
                    let new_item = new_map.get(key).unwrap_or(&NULL);
                    self.walk(*elem, &path.key(key.as_str()), old_item, new_item, force)?;
                }
            }
            (SchemaKind::Object(fields), PropertyValue::Object(old_map), PropertyValue::Object(new_map)) => {
                for key in old_map.keys().chain(new_map.keys()) {
                    if !key.starts_with("__") && node.field_by_destination(key).is_none() {
                        return Err(DiffError::UnknownProperty {
                            path: path.key(key.as_str()),
                        });
                    }
                }
                let mut fields: Vec<&Field> = fields.iter().collect();
                fields.sort_by(|a, b| a.destination_name.cmp(&b.destination_name));
                for field in fields {
                    let old_item = old_map.get(&field.destination_name).unwrap_or(&NULL);
                    let new_item = new_map.get(&field.destination_name).unwrap_or(&NULL);
                    let force = force || schema.node(field.node).force_replace;
                    self.walk(field.node, &path.key(field.destination_name.as_str()), old_item, new_item, force)?;
                }
            }
            _ => {
                if plain_old != plain_new {
                    self.push(path, DiffKind::Update, force, old, new);
                }
            }
        }
        Ok(())
    }

    /// Pairs set elements by identity. A position that lost one element and
    /// gained another is diffed in place, so the change is reported below it.
    fn walk_set(
        &mut self,
        set: SchemaId,
        elem: SchemaId,
        path: &PropertyPath,
        old_items: &[PropertyValue],
        new_items: &[PropertyValue],
        force: bool,
    ) -> Result<()> {
        let resolver = SetIdentityResolver::new(self.schema, set);
        let old_foreign = self.foreign_elements(elem, old_items, path)?;
        let new_foreign = self.foreign_elements(elem, new_items, path)?;
        let matching = resolver.match_sets(&old_foreign, &new_foreign);

        for &(p, n) in &matching.matched {
            self.walk(elem, &path.index(n), &old_items[p], &new_items[n], force)?;
        }

        let removed: BTreeSet<usize> = matching.removed.iter().copied().collect();
        let added: BTreeSet<usize> = matching.added.iter().copied().collect();
        let element_force = force || self.contains_force_replace(elem);
        for &p in &matching.removed {
            if added.contains(&p) {
                self.walk(elem, &path.index(p), &old_items[p], &new_items[p], force)?;
            } else {
                self.push(&path.index(p), DiffKind::Delete, element_force, &old_items[p], &NULL);
            }
        }
        for &n in &matching.added {
            if !removed.contains(&n) {
                self.push(&path.index(n), DiffKind::Add, element_force, &NULL, &new_items[n]);
            }
        }
        Ok(())
    }

    fn foreign_elements(
        &self,
        elem: SchemaId,
        items: &[PropertyValue],
        path: &PropertyPath,
    ) -> Result<Vec<ForeignValue>> {
        let converted = items
            .iter()
            .enumerate()
            .map(|(i, item)| value_to_foreign(self.schema, elem, item, &path.index(i)))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(converted)
    }

    fn push(&mut self, path: &PropertyPath, kind: DiffKind, force: bool, old: &PropertyValue, new: &PropertyValue) {
        let kind = if force { kind.replacing() } else { kind };
        self.records
            .push(DiffRecord::new(path.clone(), kind, old.clone(), new.clone()));
    }

    /// True when `id` or anything below it forces replacement.
    fn contains_force_replace(&self, id: SchemaId) -> bool {
        let node = self.schema.node(id);
        node.force_replace
            || match &node.kind {
                SchemaKind::List(elem) | SchemaKind::Set(elem) | SchemaKind::Map(elem) => {
                    self.contains_force_replace(*elem)
                }
                SchemaKind::Object(fields) => fields.iter().any(|f| self.contains_force_replace(f.node)),
                _ => false,
            }
    }

    fn check_shape(&self, id: SchemaId, value: &PropertyValue, path: &PropertyPath) -> Result<()> {
        let mut node = self.schema.node(id);
        if node.collapse_singleton
            && let Some(elem) = node.element()
        {
            node = self.schema.node(elem);
        }
        let fits = match (&node.kind, value) {
            (_, PropertyValue::Null | PropertyValue::Computed) => true,
            (SchemaKind::Bool, PropertyValue::Bool(_)) => true,
            (SchemaKind::Int | SchemaKind::Float, PropertyValue::Number(_)) => true,
            (SchemaKind::String, PropertyValue::String(_)) => true,
            (SchemaKind::List(_) | SchemaKind::Set(_), PropertyValue::Array(_)) => true,
            (SchemaKind::Map(_) | SchemaKind::Object(_), PropertyValue::Object(_)) => true,
            _ => false,
        };
        if fits {
            Ok(())
        } else {
            Err(DiffError::TypeMismatch {
                path: path.clone(),
                expected: node.kind.name(),
                found: value.type_name(),
            })
        }
    }
}

/// Sees through secret and output wrappers. Unknown outputs read as
/// [`PropertyValue::Computed`].
fn plain(value: &PropertyValue) -> &PropertyValue {
    match value {
        PropertyValue::Secret(inner) => plain(inner),
        PropertyValue::Output(out) if out.known => plain(&out.element),
        PropertyValue::Output(_) => &COMPUTED,
        other => other,
    }
}
