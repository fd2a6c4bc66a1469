//! State upgrade pipeline.
//!
//! Persisted state carries the schema version it was written under. Before any
//! other component sees it, [`UpgradePipeline`] walks it through the
//! resource's upgraders one version at a time until it reaches the current
//! version.
//!
//! The pipeline is entered only from read-back paths, named by
//! [`UpgradeEntry`]. There is no entry for create: freshly created state is
//! already current.

mod error;
mod pipeline;

pub use error::{UpgradeError, UpgradeResult};
pub use pipeline::{UpgradeEntry, UpgradePipeline};
