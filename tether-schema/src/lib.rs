//! Normalized schema model for tether.
//!
//! The foreign provider publishes a [`ProviderDeclaration`]; together with the
//! provider's hooks ([`Capabilities`]) and the bridge's [`BridgeConfig`],
//! [`SchemaBuilder`] turns it into a [`ProviderSchema`]:
//! - [`ResourceSchema`] — one resource or data source, nodes in a [`SchemaArena`]
//! - [`SchemaNode`] / [`SchemaKind`] — one normalized node and its shape
//! - [`to_destination_name`] — foreign to destination field naming
//!
//! The built schema is read-only and can be shared across threads.

mod arena;
mod builder;
mod capabilities;
mod config;
mod declaration;
mod naming;
mod resource;

pub use arena::{DefaultSpec, Field, SchemaArena, SchemaId, SchemaKind, SchemaNode, parse_scalar};
pub use builder::SchemaBuilder;
pub use capabilities::{
    Capabilities, DefaultFunc, PlanStateEditRequest, PreUpgradeHook, ResourceCapabilities,
    SetHash, StateEditHook, StateFunc, StateUpgrader, Validator,
};
pub use config::{BridgeConfig, FieldOverride, ResourceOverrides};
pub use declaration::{
    AttributeDeclaration, BlockDeclaration, ConfigMode, ElementDeclaration, ProviderDeclaration,
    ResourceDeclaration, ValueType,
};
pub use naming::to_destination_name;
pub use resource::{ProviderSchema, ResourceKind, ResourceSchema};

/// Result type for schema construction.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Structural errors. All of them are fatal at provider startup.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("{token}: invalid attribute {path:?}: {reason}")]
    InvalidAttribute {
        token: String,
        path: String,
        reason: String,
    },

    #[error("{token}: {path:?} references unknown shared block {name:?}")]
    UnknownSharedBlock {
        token: String,
        path: String,
        name: String,
    },

    #[error("{token}: shared block {name:?} contains itself at {path:?}")]
    RecursiveBlock {
        token: String,
        path: String,
        name: String,
    },

    #[error("{token}: fields {first:?} and {second:?} both map to {name:?}")]
    NameCollision {
        token: String,
        name: String,
        first: String,
        second: String,
    },

    #[error("{token}: override or hook names unknown attribute {path:?}")]
    UnknownOverride { token: String, path: String },

    #[error("{token}: upgrader from version {from_version} is not below current version {current}")]
    InvalidUpgrader {
        token: String,
        from_version: u64,
        current: u64,
    },

    #[error("unknown resource or data source: {0}")]
    UnknownToken(String),

    #[error("invalid path: {0}")]
    InvalidPath(#[from] tether_types::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
