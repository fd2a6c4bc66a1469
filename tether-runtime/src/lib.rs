//! Request-level façade over the reconciliation core.
//!
//! The destination engine calls one operation per resource request; each
//! operation strings the core components together around a single call into
//! the foreign provider:
//! - [`ResourceBridge`] — plan, create, read, diff, update, delete and import
//!   of managed resources
//! - [`DataSourceBridge`] — read-only lookups
//! - [`ForeignProvider`] — the provider's opaque CRUD handlers
//!
//! Persisted state read back from the engine always goes through the upgrade
//! pipeline first. State returned by create is written at the current version
//! and never upgraded.

mod data_source;
mod error;
mod plan;
mod provider;
mod resource;

pub use data_source::DataSourceBridge;
pub use error::{RuntimeError, RuntimeResult};
pub use plan::PlannedState;
pub use provider::ForeignProvider;
pub use resource::{CreateOutcome, ImportedResource, ReadOutcome, ResourceBridge, UpdateOutcome};
