//! Builds normalized schemas from foreign declarations.
//!
//! The builder validates the foreign declaration, lays every attribute out in a
//! [`SchemaArena`], and folds in field overrides and provider hooks. Anything
//! inconsistent fails the whole build; nothing is guessed.

use crate::arena::{DefaultSpec, Field, SchemaArena, SchemaId, SchemaKind, SchemaNode, parse_scalar};
use crate::capabilities::{Capabilities, DefaultFunc, ResourceCapabilities, SetHash, StateFunc, Validator};
use crate::config::{BridgeConfig, FieldOverride, ResourceOverrides};
use crate::declaration::{
    AttributeDeclaration, BlockDeclaration, ElementDeclaration, ProviderDeclaration,
    ResourceDeclaration, ValueType,
};
use crate::naming::to_destination_name;
use crate::resource::{ProviderSchema, ResourceKind, ResourceSchema};
use crate::{SchemaError, SchemaResult};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tether_types::{ForeignValue, PropertyPath};
use tracing::debug;

/// Turns a [`ProviderDeclaration`] plus hooks and config into a [`ProviderSchema`].
pub struct SchemaBuilder<'a> {
    declaration: &'a ProviderDeclaration,
    capabilities: &'a Capabilities,
    config: &'a BridgeConfig,
}

impl<'a> SchemaBuilder<'a> {
    pub fn new(
        declaration: &'a ProviderDeclaration,
        capabilities: &'a Capabilities,
        config: &'a BridgeConfig,
    ) -> Self {
        Self {
            declaration,
            capabilities,
            config,
        }
    }

    /// Builds every resource and data source schema.
    pub fn build(&self) -> SchemaResult<ProviderSchema> {
        self.check_tokens()?;

        let mut resources = BTreeMap::new();
        for (token, decl) in &self.declaration.resources {
            let schema = self.build_one(token, decl, ResourceKind::Resource)?;
            resources.insert(token.clone(), schema);
        }
        let mut data_sources = BTreeMap::new();
        for (token, decl) in &self.declaration.data_sources {
            let schema = self.build_one(token, decl, ResourceKind::DataSource)?;
            data_sources.insert(token.clone(), schema);
        }

        Ok(ProviderSchema {
            resources,
            data_sources,
            supports_secrets: self.config.supports_secrets,
            apply_defaults: self.config.apply_defaults,
        })
    }

    fn check_tokens(&self) -> SchemaResult<()> {
        let declared = |token: &str| {
            self.declaration.resources.contains_key(token)
                || self.declaration.data_sources.contains_key(token)
        };
        for token in self.capabilities.tokens() {
            if !declared(token) {
                return Err(SchemaError::UnknownToken(token.to_string()));
            }
        }
        for token in self.config.resources.keys() {
            if !self.declaration.resources.contains_key(token) {
                return Err(SchemaError::UnknownToken(token.clone()));
            }
        }
        for token in self.config.data_sources.keys() {
            if !self.declaration.data_sources.contains_key(token) {
                return Err(SchemaError::UnknownToken(token.clone()));
            }
        }
        Ok(())
    }

    fn build_one(
        &self,
        token: &str,
        decl: &ResourceDeclaration,
        kind: ResourceKind,
    ) -> SchemaResult<ResourceSchema> {
        let empty_overrides = ResourceOverrides::default();
        let empty_caps = ResourceCapabilities::default();
        let overrides = match kind {
            ResourceKind::Resource => self.config.resource(token),
            ResourceKind::DataSource => self.config.data_source(token),
        }
        .unwrap_or(&empty_overrides);
        let caps = self.capabilities.get(token).unwrap_or(&empty_caps);

        let mut build = ResourceBuild::new(token, &self.declaration.shared_blocks, overrides, caps)?;
        let root = build.build_block(&PropertyPath::new(), &decl.attributes)?;
        build.check_all_used()?;

        if let Some((&from, _)) = caps.upgraders.range(decl.schema_version..).next() {
            return Err(SchemaError::InvalidUpgrader {
                token: token.to_string(),
                from_version: from,
                current: decl.schema_version,
            });
        }

        debug!(
            token = %token,
            nodes = build.arena.len(),
            version = decl.schema_version,
            "Built schema"
        );

        Ok(ResourceSchema {
            token: token.to_string(),
            kind,
            arena: build.arena,
            root,
            version: decl.schema_version,
            upgraders: caps.upgraders.clone(),
            pre_upgrade_hook: caps.pre_upgrade_hook.clone(),
            state_edit_hook: caps.state_edit_hook.clone(),
            delete_before_replace: overrides.delete_before_replace,
        })
    }
}

/// Per-resource build state.
struct ResourceBuild<'a> {
    token: &'a str,
    shared: &'a BTreeMap<String, BlockDeclaration>,
    arena: SchemaArena,
    overrides: BTreeMap<PropertyPath, &'a FieldOverride>,
    set_hashes: BTreeMap<PropertyPath, Arc<dyn SetHash>>,
    validators: BTreeMap<PropertyPath, Arc<dyn Validator>>,
    state_funcs: BTreeMap<PropertyPath, Arc<dyn StateFunc>>,
    default_funcs: BTreeMap<PropertyPath, Arc<dyn DefaultFunc>>,
    visited: BTreeSet<PropertyPath>,
    block_stack: Vec<String>,
}

fn parse_keys<V: Clone>(entries: &BTreeMap<String, V>) -> SchemaResult<BTreeMap<PropertyPath, V>> {
    let mut parsed = BTreeMap::new();
    for (key, value) in entries {
        parsed.insert(PropertyPath::parse(key)?, value.clone());
    }
    Ok(parsed)
}

impl<'a> ResourceBuild<'a> {
    fn new(
        token: &'a str,
        shared: &'a BTreeMap<String, BlockDeclaration>,
        overrides: &'a ResourceOverrides,
        caps: &'a ResourceCapabilities,
    ) -> SchemaResult<Self> {
        let mut parsed_overrides = BTreeMap::new();
        for (key, field) in &overrides.fields {
            parsed_overrides.insert(PropertyPath::parse(key)?, field);
        }
        Ok(Self {
            token,
            shared,
            arena: SchemaArena::new(),
            overrides: parsed_overrides,
            set_hashes: parse_keys(&caps.set_hashes)?,
            validators: parse_keys(&caps.validators)?,
            state_funcs: parse_keys(&caps.state_funcs)?,
            default_funcs: parse_keys(&caps.default_funcs)?,
            visited: BTreeSet::new(),
            block_stack: Vec::new(),
        })
    }

    fn invalid(&self, path: &PropertyPath, reason: impl Into<String>) -> SchemaError {
        SchemaError::InvalidAttribute {
            token: self.token.to_string(),
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Every override and hook must name a path that exists in the schema.
    fn check_all_used(&self) -> SchemaResult<()> {
        let registered = self
            .overrides
            .keys()
            .chain(self.set_hashes.keys())
            .chain(self.validators.keys())
            .chain(self.state_funcs.keys())
            .chain(self.default_funcs.keys());
        for path in registered {
            if !self.visited.contains(path) {
                return Err(SchemaError::UnknownOverride {
                    token: self.token.to_string(),
                    path: path.to_string(),
                });
            }
        }
        Ok(())
    }

    fn build_block(
        &mut self,
        path: &PropertyPath,
        attributes: &BTreeMap<String, AttributeDeclaration>,
    ) -> SchemaResult<SchemaId> {
        self.visited.insert(path.clone());
        let mut fields = Vec::with_capacity(attributes.len());
        let mut taken: BTreeMap<String, String> = BTreeMap::new();

        for (name, attr) in attributes {
            let child = path.key(name.as_str());
            let node = self.build_attribute(&child, attr, true)?;
            let destination_name = self
                .overrides
                .get(&child)
                .and_then(|o| o.name.clone())
                .unwrap_or_else(|| to_destination_name(name));
            if let Some(other) = taken.insert(destination_name.clone(), name.clone()) {
                return Err(SchemaError::NameCollision {
                    token: self.token.to_string(),
                    name: destination_name,
                    first: other,
                    second: name.clone(),
                });
            }
            fields.push(Field {
                foreign_name: name.clone(),
                destination_name,
                node,
            });
        }

        let mut node = SchemaNode::new(SchemaKind::Object(fields));
        if let Some(secret) = self.overrides.get(path).and_then(|o| o.secret) {
            node.sensitive = secret;
        }
        Ok(self.arena.push(node))
    }

    fn build_element(
        &mut self,
        path: &PropertyPath,
        elem: &ElementDeclaration,
    ) -> SchemaResult<SchemaId> {
        match elem {
            ElementDeclaration::Attribute(attr) => self.build_attribute(path, attr, false),
            ElementDeclaration::Block(block) => self.build_block(path, &block.attributes),
            ElementDeclaration::Named(name) => {
                let shared = self.shared;
                let block = shared.get(name).ok_or_else(|| SchemaError::UnknownSharedBlock {
                    token: self.token.to_string(),
                    path: path.to_string(),
                    name: name.clone(),
                })?;
                if self.block_stack.contains(name) {
                    return Err(SchemaError::RecursiveBlock {
                        token: self.token.to_string(),
                        path: path.to_string(),
                        name: name.clone(),
                    });
                }
                self.block_stack.push(name.clone());
                let result = self.build_block(path, &block.attributes);
                self.block_stack.pop();
                result
            }
        }
    }

    fn check_flags(&self, path: &PropertyPath, decl: &AttributeDeclaration) -> SchemaResult<()> {
        if !decl.optional && !decl.required && !decl.computed {
            return Err(self.invalid(path, "one of optional, required or computed must be set"));
        }
        if decl.required && (decl.optional || decl.computed) {
            return Err(self.invalid(path, "required cannot be combined with optional or computed"));
        }
        if decl.default.is_some() && decl.required {
            return Err(self.invalid(path, "required attributes cannot have a default"));
        }
        if decl.default.is_some() && decl.computed && !decl.optional {
            return Err(self.invalid(path, "computed-only attributes cannot have a default"));
        }
        Ok(())
    }

    fn build_attribute(
        &mut self,
        path: &PropertyPath,
        decl: &AttributeDeclaration,
        is_field: bool,
    ) -> SchemaResult<SchemaId> {
        self.visited.insert(path.clone());
        if is_field {
            self.check_flags(path, decl)?;
        }
        let field_override = self.overrides.get(path).copied();

        let kind = match decl.ty {
            ValueType::Bool | ValueType::Int | ValueType::Float | ValueType::String => {
                if decl.elem.is_some() {
                    return Err(self.invalid(path, "scalar attributes cannot declare an element"));
                }
                match decl.ty {
                    ValueType::Bool => SchemaKind::Bool,
                    ValueType::Int => SchemaKind::Int,
                    ValueType::Float => SchemaKind::Float,
                    _ => SchemaKind::String,
                }
            }
            ValueType::List | ValueType::Set | ValueType::Map => {
                let Some(elem) = &decl.elem else {
                    return Err(self.invalid(path, "collection attributes must declare an element"));
                };
                if decl.ty == ValueType::Map && !matches!(elem, ElementDeclaration::Attribute(_)) {
                    return Err(self.invalid(path, "map elements must be plain attributes"));
                }
                let elem_id = self.build_element(&path.wildcard(), elem)?;
                match decl.ty {
                    ValueType::List => SchemaKind::List(elem_id),
                    ValueType::Set => SchemaKind::Set(elem_id),
                    _ => SchemaKind::Map(elem_id),
                }
            }
        };

        let is_sequence = matches!(kind, SchemaKind::List(_) | SchemaKind::Set(_));
        if decl.max_items > 0 && !is_sequence {
            return Err(self.invalid(path, "max_items only applies to lists and sets"));
        }
        let collapse_singleton = match field_override.and_then(|o| o.collapse_singleton) {
            Some(true) if !is_sequence => {
                return Err(self.invalid(path, "only lists and sets can collapse to a single value"));
            }
            Some(collapse) => collapse,
            None => is_sequence && decl.max_items == 1,
        };

        let set_hash = self.set_hashes.get(path).cloned();
        if set_hash.is_some() && !matches!(kind, SchemaKind::Set(_)) {
            return Err(self.invalid(path, format!("set hash registered on a {}", kind.name())));
        }

        let default = self.default_spec(path, decl, field_override, &kind)?;

        let mut node = SchemaNode::new(kind);
        node.optional = decl.optional;
        node.required = decl.required;
        node.computed = decl.computed;
        node.force_replace = field_override
            .and_then(|o| o.force_replace)
            .unwrap_or(decl.force_new);
        node.sensitive = field_override.and_then(|o| o.secret).unwrap_or(decl.sensitive);
        node.collapse_singleton = collapse_singleton;
        node.max_items = decl.max_items;
        node.config_mode = decl.config_mode;
        node.always_include_in_import = field_override.is_some_and(|o| o.always_include_in_import);
        node.default = default;
        node.set_hash = set_hash;
        node.validator = self.validators.get(path).cloned();
        node.state_func = self.state_funcs.get(path).cloned();
        Ok(self.arena.push(node))
    }

    fn default_spec(
        &self,
        path: &PropertyPath,
        decl: &AttributeDeclaration,
        field_override: Option<&FieldOverride>,
        kind: &SchemaKind,
    ) -> SchemaResult<DefaultSpec> {
        let literal = field_override
            .and_then(|o| o.default.as_ref())
            .or(decl.default.as_ref());
        let spec = DefaultSpec {
            env_vars: field_override.map(|o| o.default_env.clone()).unwrap_or_default(),
            func: self.default_funcs.get(path).cloned(),
            value: literal
                .map(|v| json_to_scalar(kind, v))
                .transpose()
                .map_err(|reason| self.invalid(path, format!("bad default: {reason}")))?,
        };
        if spec.is_empty() {
            return Ok(spec);
        }
        if !matches!(
            kind,
            SchemaKind::Bool | SchemaKind::Int | SchemaKind::Float | SchemaKind::String
        ) {
            return Err(self.invalid(path, "defaults are only supported on scalar attributes"));
        }
        if decl.required {
            return Err(self.invalid(path, "required attributes cannot have a default"));
        }
        Ok(spec)
    }
}

fn json_to_scalar(kind: &SchemaKind, value: &serde_json::Value) -> Result<ForeignValue, String> {
    use serde_json::Value;
    match (kind, value) {
        (SchemaKind::Bool, Value::Bool(b)) => Ok(ForeignValue::Bool(*b)),
        (SchemaKind::Int, Value::Number(n)) => n
            .as_i64()
            .map(ForeignValue::Int)
            .ok_or_else(|| format!("{n} is not an integer")),
        (SchemaKind::Float, Value::Number(n)) => n
            .as_f64()
            .map(ForeignValue::Float)
            .ok_or_else(|| format!("{n} is not a number")),
        (_, Value::String(s)) => parse_scalar(kind, s),
        (kind, other) => Err(format!("{other} does not fit a {}", kind.name())),
    }
}
