//! Error types for state upgrades.

use tether_convert::ConvertError;
use thiserror::Error;

/// Result type for state upgrades.
pub type UpgradeResult<T> = Result<T, UpgradeError>;

/// Errors raised while upgrading persisted state. None of them leave a
/// partially upgraded state behind.
#[derive(Debug, Error)]
pub enum UpgradeError {
    /// Stored state is newer than the schema.
    #[error("{token}: cannot downgrade state from version {stored} to {current}")]
    Downgrade { token: String, stored: u64, current: u64 },

    /// A version in the chain has no upgrader.
    #[error("{token}: no upgrader from version {from} (current version {current})")]
    MissingUpgrader { token: String, from: u64, current: u64 },

    /// An upgrader failed; its message is kept verbatim.
    #[error("{token}: upgrade from version {from} failed: {message}")]
    Upgrader { token: String, from: u64, message: String },

    /// The pre-upgrade hook failed; its message is kept verbatim.
    #[error("{token}: pre-upgrade hook failed: {message}")]
    Hook { token: String, message: String },

    /// Upgraded state does not fit the current schema.
    #[error(transparent)]
    Decode(#[from] ConvertError),
}
