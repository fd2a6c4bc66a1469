//! Arena-allocated normalized schema nodes.
//!
//! Nodes refer to their children by [`SchemaId`], so nested blocks never form
//! ownership cycles. An arena is built once per resource and is read-only
//! afterwards.

use crate::capabilities::{DefaultFunc, SetHash, StateFunc, Validator};
use crate::declaration::ConfigMode;
use std::fmt;
use std::ops::Index;
use std::sync::Arc;
use tether_types::ForeignValue;

/// Index of a node inside a [`SchemaArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(u32);

impl SchemaId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named child of an object node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub foreign_name: String,
    pub destination_name: String,
    pub node: SchemaId,
}

/// Shape of a schema node. Matched exhaustively by every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaKind {
    Bool,
    Int,
    Float,
    String,
    List(SchemaId),
    Set(SchemaId),
    /// String-keyed map; keys are data and are never renamed.
    Map(SchemaId),
    /// Nested block or resource root; fields sorted by foreign name.
    Object(Vec<Field>),
}

impl SchemaKind {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SchemaKind::Bool => "bool",
            SchemaKind::Int => "int",
            SchemaKind::Float => "float",
            SchemaKind::String => "string",
            SchemaKind::List(_) => "list",
            SchemaKind::Set(_) => "set",
            SchemaKind::Map(_) => "map",
            SchemaKind::Object(_) => "object",
        }
    }
}

/// Where a default value comes from.
///
/// Environment variables win when one is set, then the literal value, then
/// the function.
#[derive(Clone, Default)]
pub struct DefaultSpec {
    pub env_vars: Vec<String>,
    pub func: Option<Arc<dyn DefaultFunc>>,
    pub value: Option<ForeignValue>,
}

impl DefaultSpec {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.env_vars.is_empty() && self.func.is_none() && self.value.is_none()
    }

    /// Resolves the default for a scalar of `kind`.
    ///
    /// Environment values are strings and are parsed into the node's kind.
    pub fn resolve(&self, kind: &SchemaKind) -> Result<Option<ForeignValue>, String> {
        for var in &self.env_vars {
            if let Ok(raw) = std::env::var(var) {
                return parse_scalar(kind, &raw)
                    .map(Some)
                    .map_err(|reason| format!("environment variable {var}: {reason}"));
            }
        }
        if let Some(value) = &self.value {
            return Ok(Some(value.clone()));
        }
        self.func.as_ref().map(|func| func.default_value()).transpose()
    }
}

impl fmt::Debug for DefaultSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultSpec")
            .field("env_vars", &self.env_vars)
            .field("func", &self.func.is_some())
            .field("value", &self.value)
            .finish()
    }
}

/// Parses a string into a scalar of the given kind.
pub fn parse_scalar(kind: &SchemaKind, raw: &str) -> Result<ForeignValue, String> {
    match kind {
        SchemaKind::String => Ok(ForeignValue::string(raw)),
        SchemaKind::Bool => match raw {
            "true" | "1" => Ok(ForeignValue::Bool(true)),
            "false" | "0" => Ok(ForeignValue::Bool(false)),
            _ => Err(format!("{raw:?} is not a bool")),
        },
        SchemaKind::Int => raw
            .parse::<i64>()
            .map(ForeignValue::Int)
            .map_err(|_| format!("{raw:?} is not an integer")),
        SchemaKind::Float => raw
            .parse::<f64>()
            .map(ForeignValue::Float)
            .map_err(|_| format!("{raw:?} is not a number")),
        other => Err(format!("cannot parse a {} from a string", other.name())),
    }
}

/// One normalized schema node.
#[derive(Clone)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    pub optional: bool,
    pub required: bool,
    pub computed: bool,
    pub force_replace: bool,
    /// Effective secret classification, after overrides.
    pub sensitive: bool,
    /// A list/set presented to the destination as its single element.
    pub collapse_singleton: bool,
    pub max_items: u64,
    pub config_mode: ConfigMode,
    pub always_include_in_import: bool,
    pub default: DefaultSpec,
    pub set_hash: Option<Arc<dyn SetHash>>,
    pub validator: Option<Arc<dyn Validator>>,
    pub state_func: Option<Arc<dyn StateFunc>>,
}

impl SchemaNode {
    #[must_use]
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            optional: false,
            required: false,
            computed: false,
            force_replace: false,
            sensitive: false,
            collapse_singleton: false,
            max_items: 0,
            config_mode: ConfigMode::Auto,
            always_include_in_import: false,
            default: DefaultSpec::default(),
            set_hash: None,
            validator: None,
            state_func: None,
        }
    }

    /// Computed and not settable: read-only to the destination.
    #[must_use]
    pub fn is_output_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }

    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(
            self.kind,
            SchemaKind::Bool | SchemaKind::Int | SchemaKind::Float | SchemaKind::String
        )
    }

    /// Element node of a list, set or map.
    pub fn element(&self) -> Option<SchemaId> {
        match self.kind {
            SchemaKind::List(e) | SchemaKind::Set(e) | SchemaKind::Map(e) => Some(e),
            _ => None,
        }
    }

    /// Fields of an object node; empty for every other kind.
    pub fn fields(&self) -> &[Field] {
        match &self.kind {
            SchemaKind::Object(fields) => fields,
            _ => &[],
        }
    }

    pub fn field(&self, foreign_name: &str) -> Option<&Field> {
        self.fields().iter().find(|f| f.foreign_name == foreign_name)
    }

    pub fn field_by_destination(&self, destination_name: &str) -> Option<&Field> {
        self.fields()
            .iter()
            .find(|f| f.destination_name == destination_name)
    }
}

impl fmt::Debug for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaNode")
            .field("kind", &self.kind)
            .field("optional", &self.optional)
            .field("required", &self.required)
            .field("computed", &self.computed)
            .field("force_replace", &self.force_replace)
            .field("sensitive", &self.sensitive)
            .field("collapse_singleton", &self.collapse_singleton)
            .field("config_mode", &self.config_mode)
            .field("set_hash", &self.set_hash.is_some())
            .field("validator", &self.validator.is_some())
            .field("state_func", &self.state_func.is_some())
            .finish_non_exhaustive()
    }
}

/// Owner of all nodes of one resource schema.
#[derive(Debug, Clone, Default)]
pub struct SchemaArena {
    nodes: Vec<SchemaNode>,
}

impl SchemaArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: SchemaNode) -> SchemaId {
        let id = SchemaId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: SchemaId) -> Option<&SchemaNode> {
        self.nodes.get(id.index())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Index<SchemaId> for SchemaArena {
    type Output = SchemaNode;

    fn index(&self, id: SchemaId) -> &SchemaNode {
        &self.nodes[id.index()]
    }
}
