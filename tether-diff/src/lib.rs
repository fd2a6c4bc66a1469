//! Structural diff of destination property trees.
//!
//! - [`diff`] — compare prior and proposed properties of one resource
//! - [`DiffRecord`] / [`DiffKind`] — one path-addressed change
//! - [`DiffResult`] — every record plus the aggregate change signals
//! - [`IgnorePath`] — path patterns whose changes are suppressed
//!
//! The walk follows the schema, not the values: ordered collections compare
//! by index, sets compare by element identity, maps and blocks by key.

mod engine;
mod ignore;
mod record;

pub use engine::{DiffOptions, diff};
pub use ignore::IgnorePath;
pub use record::{DiffKind, DiffRecord, DiffResult};

use tether_convert::ConvertError;
use tether_types::PropertyPath;

/// Result type for diff operations.
pub type Result<T> = std::result::Result<T, DiffError>;

/// Errors raised while diffing.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: PropertyPath,
        expected: &'static str,
        found: &'static str,
    },

    #[error("unknown property {path}")]
    UnknownProperty { path: PropertyPath },

    #[error("invalid ignore path: {0}")]
    InvalidIgnorePath(#[from] tether_types::Error),

    #[error(transparent)]
    Convert(#[from] ConvertError),
}
