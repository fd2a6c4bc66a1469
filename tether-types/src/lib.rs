//! Core type definitions for tether.
//!
//! This crate defines the value model shared by every reconciliation component:
//! - [`PropertyValue`] — the destination engine's structured property values
//!   (with secret, unknown and output-dependency markers)
//! - [`PropertyPath`] — dotted/bracketed addresses into a property tree
//! - [`ForeignValue`] — values as the foreign provider types them
//! - [`RawState`] — persisted foreign state tagged with its schema version
//!
//! Schema-aware behavior (naming, collapsing, sets) lives in the crates above
//! this one; everything here is schema-agnostic.

mod foreign;
mod path;
mod raw_state;
mod value;

pub use foreign::{ForeignValue, UNKNOWN_SENTINEL};
pub use path::{PathSegment, PropertyPath};
pub use raw_state::RawState;
pub use value::{Output, PropertyMap, PropertyValue};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid property path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("invalid raw state: {0}")]
    InvalidRawState(String),
}
