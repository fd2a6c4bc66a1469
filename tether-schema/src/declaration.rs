//! Schema declarations as the foreign provider publishes them.
//!
//! These types are a faithful, unvalidated description of the foreign schema.
//! [`SchemaBuilder`](crate::SchemaBuilder) checks them and turns them into the
//! normalized arena form.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The foreign type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Bool,
    Int,
    Float,
    String,
    List,
    Set,
    Map,
}

impl ValueType {
    #[must_use]
    pub fn is_collection(self) -> bool {
        matches!(self, ValueType::List | ValueType::Set | ValueType::Map)
    }
}

/// Whether an empty collection is written as a block or as an attribute.
///
/// Only recorded on the schema; the marshaler decides what it means for
/// null-vs-empty handling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigMode {
    #[default]
    Auto,
    Attr,
    Block,
}

/// Element type of a list, set or map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementDeclaration {
    /// A plain (usually scalar) element.
    Attribute(Box<AttributeDeclaration>),
    /// A nested block with its own attributes.
    Block(BlockDeclaration),
    /// A reference to a block in [`ProviderDeclaration::shared_blocks`].
    Named(String),
}

/// A nested block: a set of named attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockDeclaration {
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeDeclaration>,
}

impl BlockDeclaration {
    pub fn new<K: Into<String>>(attributes: impl IntoIterator<Item = (K, AttributeDeclaration)>) -> Self {
        Self {
            attributes: attributes.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// One attribute of a resource, data source or block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDeclaration {
    #[serde(rename = "type")]
    pub ty: ValueType,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub computed: bool,
    #[serde(default)]
    pub force_new: bool,
    #[serde(default)]
    pub sensitive: bool,
    /// Zero means unbounded.
    #[serde(default)]
    pub max_items: u64,
    #[serde(default)]
    pub config_mode: ConfigMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elem: Option<ElementDeclaration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl AttributeDeclaration {
    #[must_use]
    pub fn new(ty: ValueType) -> Self {
        Self {
            ty,
            optional: false,
            required: false,
            computed: false,
            force_new: false,
            sensitive: false,
            max_items: 0,
            config_mode: ConfigMode::Auto,
            elem: None,
            default: None,
        }
    }

    /// Shorthand for a string attribute.
    #[must_use]
    pub fn string() -> Self {
        Self::new(ValueType::String)
    }

    #[must_use]
    pub fn bool() -> Self {
        Self::new(ValueType::Bool)
    }

    #[must_use]
    pub fn int() -> Self {
        Self::new(ValueType::Int)
    }

    #[must_use]
    pub fn float() -> Self {
        Self::new(ValueType::Float)
    }

    /// A list of plain elements.
    #[must_use]
    pub fn list_of(elem: AttributeDeclaration) -> Self {
        Self::new(ValueType::List).with_elem(ElementDeclaration::Attribute(Box::new(elem)))
    }

    /// A set of plain elements.
    #[must_use]
    pub fn set_of(elem: AttributeDeclaration) -> Self {
        Self::new(ValueType::Set).with_elem(ElementDeclaration::Attribute(Box::new(elem)))
    }

    /// A string-keyed map of plain elements.
    #[must_use]
    pub fn map_of(elem: AttributeDeclaration) -> Self {
        Self::new(ValueType::Map).with_elem(ElementDeclaration::Attribute(Box::new(elem)))
    }

    /// A list of nested blocks.
    #[must_use]
    pub fn block_list(block: BlockDeclaration) -> Self {
        Self::new(ValueType::List).with_elem(ElementDeclaration::Block(block))
    }

    /// A set of nested blocks.
    #[must_use]
    pub fn block_set(block: BlockDeclaration) -> Self {
        Self::new(ValueType::Set).with_elem(ElementDeclaration::Block(block))
    }

    #[must_use]
    pub fn with_elem(mut self, elem: ElementDeclaration) -> Self {
        self.elem = Some(elem);
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    #[must_use]
    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    #[must_use]
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    #[must_use]
    pub fn max_items(mut self, max: u64) -> Self {
        self.max_items = max;
        self
    }

    #[must_use]
    pub fn config_mode(mut self, mode: ConfigMode) -> Self {
        self.config_mode = mode;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// Schema of one managed resource or data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceDeclaration {
    #[serde(default)]
    pub schema_version: u64,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeDeclaration>,
}

impl ResourceDeclaration {
    pub fn new<K: Into<String>>(attributes: impl IntoIterator<Item = (K, AttributeDeclaration)>) -> Self {
        Self {
            schema_version: 0,
            attributes: attributes.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: u64) -> Self {
        self.schema_version = version;
        self
    }
}

/// Everything a foreign provider declares, read once at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderDeclaration {
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceDeclaration>,
    #[serde(default)]
    pub data_sources: BTreeMap<String, ResourceDeclaration>,
    /// Blocks referenced by name from [`ElementDeclaration::Named`].
    #[serde(default)]
    pub shared_blocks: BTreeMap<String, BlockDeclaration>,
}
