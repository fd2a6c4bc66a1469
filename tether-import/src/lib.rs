//! Import of resources discovered outside the destination engine.
//!
//! [`import_inputs`] validates the discovered state attribute by attribute and
//! turns what survives into inputs for the generated configuration:
//! - a failing attribute that is computed and not required is dropped
//!   (the provider derives it again on the next read),
//! - any other failing attribute is kept and reported as an error.
//!
//! Validation stays at the attribute's own level. Nested block fields are not
//! validated, and element validators of lists and sets only run when the
//! elements are scalars; block elements pass through unvalidated.

mod validate;

pub use validate::{ImportDiagnostic, ImportOutcome, Severity, import_inputs};

use tether_convert::ConvertError;
use thiserror::Error;

/// Result type for imports.
pub type ImportResult<T> = Result<T, ImportError>;

/// Errors that stop an import. Validation failures are not errors; they are
/// reported as [`ImportDiagnostic`]s.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("imported state must be an object, found {0}")]
    InvalidState(&'static str),

    #[error(transparent)]
    Convert(#[from] ConvertError),
}
