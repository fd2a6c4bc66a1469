//! Value marshaling between the foreign provider and the destination model.
//!
//! - [`to_destination`] — foreign state to a destination [`PropertyMap`]
//! - [`to_foreign`] — destination inputs or state back to a foreign value
//! - [`decode_raw_state`] / [`encode_raw_state`] — persisted state codec
//! - [`apply_state_funcs`] — run the provider's value transforms over inputs
//! - [`extract_inputs_from_outputs`] — recover inputs on refresh and import
//!
//! All conversions are pure. Values that do not fit the schema are reported
//! with their path, never coerced silently (the only coercion is a foreign
//! string holding a bool or number, which is parsed).

mod extract;
mod inward;
mod outward;
mod raw;
mod transform;

pub use extract::{ExtractMode, extract_inputs_from_outputs, is_zero_value};
pub use inward::{InputOptions, to_foreign, value_to_foreign};
pub use outward::{OutputContext, StateOrigin, to_destination, value_to_destination};
pub use raw::{decode_raw_state, encode_raw_state};
pub use transform::apply_state_funcs;

use tether_types::PropertyPath;

/// Result type for conversions.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Errors raised while converting values.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: PropertyPath,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{path} holds at most one element, found {count}")]
    TooManyElements { path: PropertyPath, count: usize },

    #[error("unknown property {path}")]
    UnknownProperty { path: PropertyPath },

    #[error("default for {path} failed: {message}")]
    Default { path: PropertyPath, message: String },

    #[error("state is at version {found}, expected {expected}; upgrade it first")]
    StaleState { found: u64, expected: u64 },

    #[error("invalid state: {0}")]
    InvalidState(String),
}
