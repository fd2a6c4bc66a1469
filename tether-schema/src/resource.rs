use crate::arena::{Field, SchemaArena, SchemaId, SchemaKind, SchemaNode};
use crate::capabilities::{PreUpgradeHook, StateEditHook, StateUpgrader};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tether_types::{PathSegment, PropertyPath};

/// Whether a schema describes a managed resource or a read-only lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Resource,
    DataSource,
}

/// The normalized schema of one resource or data source.
#[derive(Clone)]
pub struct ResourceSchema {
    pub token: String,
    pub kind: ResourceKind,
    pub arena: SchemaArena,
    /// Object node holding the top-level attributes.
    pub root: SchemaId,
    /// Current schema version; persisted state is upgraded to this.
    pub version: u64,
    /// Keyed by the version each upgrader migrates from.
    pub upgraders: BTreeMap<u64, Arc<dyn StateUpgrader>>,
    pub pre_upgrade_hook: Option<Arc<dyn PreUpgradeHook>>,
    pub state_edit_hook: Option<Arc<dyn StateEditHook>>,
    pub delete_before_replace: bool,
}

impl ResourceSchema {
    #[must_use]
    pub fn node(&self, id: SchemaId) -> &SchemaNode {
        &self.arena[id]
    }

    #[must_use]
    pub fn root_node(&self) -> &SchemaNode {
        &self.arena[self.root]
    }

    /// Top-level fields, sorted by foreign name.
    pub fn fields(&self) -> &[Field] {
        self.root_node().fields()
    }

    pub fn field(&self, foreign_name: &str) -> Option<&Field> {
        self.root_node().field(foreign_name)
    }

    pub fn field_by_destination(&self, destination_name: &str) -> Option<&Field> {
        self.root_node().field_by_destination(destination_name)
    }

    /// Resolves a foreign attribute path (`rule[*].port`, `tags.env`).
    pub fn lookup_foreign(&self, path: &PropertyPath) -> Option<SchemaId> {
        let mut current = self.root;
        for segment in path.segments() {
            let node = self.node(current);
            current = match (segment, &node.kind) {
                (PathSegment::Key(key), SchemaKind::Object(_)) => node.field(key)?.node,
                (PathSegment::Key(_) | PathSegment::Wildcard, SchemaKind::Map(elem)) => *elem,
                (
                    PathSegment::Index(_) | PathSegment::Wildcard,
                    SchemaKind::List(elem) | SchemaKind::Set(elem),
                ) => *elem,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Resolves a destination property path, seeing through collapsed
    /// singleton collections.
    pub fn lookup_destination(&self, path: &PropertyPath) -> Option<SchemaId> {
        let mut current = self.root;
        for segment in path.segments() {
            let mut node = self.node(current);
            if node.collapse_singleton {
                current = node.element()?;
                node = self.node(current);
            }
            current = match (segment, &node.kind) {
                (PathSegment::Key(key), SchemaKind::Object(_)) => {
                    node.field_by_destination(key)?.node
                }
                (PathSegment::Key(_) | PathSegment::Wildcard, SchemaKind::Map(elem)) => *elem,
                (
                    PathSegment::Index(_) | PathSegment::Wildcard,
                    SchemaKind::List(elem) | SchemaKind::Set(elem),
                ) => *elem,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl fmt::Debug for ResourceSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSchema")
            .field("token", &self.token)
            .field("kind", &self.kind)
            .field("nodes", &self.arena.len())
            .field("version", &self.version)
            .field("upgraders", &self.upgraders.keys().collect::<Vec<_>>())
            .field("pre_upgrade_hook", &self.pre_upgrade_hook.is_some())
            .field("state_edit_hook", &self.state_edit_hook.is_some())
            .field("delete_before_replace", &self.delete_before_replace)
            .finish()
    }
}

/// Every normalized schema of a provider, built once and shared read-only.
#[derive(Debug, Clone)]
pub struct ProviderSchema {
    pub resources: BTreeMap<String, ResourceSchema>,
    pub data_sources: BTreeMap<String, ResourceSchema>,
    pub supports_secrets: bool,
    pub apply_defaults: bool,
}

impl ProviderSchema {
    pub fn resource(&self, token: &str) -> Option<&ResourceSchema> {
        self.resources.get(token)
    }

    pub fn data_source(&self, token: &str) -> Option<&ResourceSchema> {
        self.data_sources.get(token)
    }
}
