//! Error types for request handling.

use tether_convert::ConvertError;
use tether_diff::DiffError;
use tether_import::ImportError;
use tether_state::UpgradeError;
use thiserror::Error;

/// Result type for bridge operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that fail a request. Nothing here is retried.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// No resource or data source is declared under this token.
    #[error("unknown token: {0}")]
    UnknownToken(String),

    /// The foreign provider rejected the call; its message is kept verbatim.
    #[error("{token}: {operation} failed: {message}")]
    Foreign {
        token: String,
        operation: &'static str,
        message: String,
    },

    /// The provider's state-edit hook rejected the planned state.
    #[error("{token}: state edit failed: {message}")]
    StateEdit { token: String, message: String },

    /// An import named a resource the provider could not find.
    #[error("{token}: no resource with id {id}")]
    NotFound { token: String, id: String },

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error(transparent)]
    Upgrade(#[from] UpgradeError),

    #[error(transparent)]
    Import(#[from] ImportError),
}
