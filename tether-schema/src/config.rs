//! Bridge configuration, read from `tether.toml`.
//!
//! ```toml
//! supports_secrets = true
//!
//! [resources.example_firewall]
//! delete_before_replace = true
//!
//! [resources.example_firewall.fields.rule]
//! collapse_singleton = false
//!
//! [resources.example_firewall.fields."rule[*].port"]
//! name = "portNumber"
//! ```

use crate::{SchemaError, SchemaResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Per-field adjustments layered over the foreign schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldOverride {
    /// Destination name, replacing the camel-cased foreign name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Forces (or suppresses) presenting a list/set as a single value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapse_singleton: Option<bool>,
    /// Forces (or retracts) secret classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_replace: Option<bool>,
    /// Keep this field in import output even when it holds its default.
    #[serde(default)]
    pub always_include_in_import: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Environment variables consulted, in order, for a default.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_env: Vec<String>,
}

/// Overrides for one resource or data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceOverrides {
    #[serde(default)]
    pub delete_before_replace: bool,
    /// Keyed by foreign attribute path (`rule`, `rule[*].port`).
    #[serde(default)]
    pub fields: BTreeMap<String, FieldOverride>,
}

/// Configuration parsed from `tether.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Whether the destination engine accepts secret markers.
    #[serde(default = "default_true")]
    pub supports_secrets: bool,
    /// Whether absent optional inputs receive their defaults.
    #[serde(default = "default_true")]
    pub apply_defaults: bool,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceOverrides>,
    #[serde(default)]
    pub data_sources: BTreeMap<String, ResourceOverrides>,
}

fn default_true() -> bool {
    true
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            supports_secrets: true,
            apply_defaults: true,
            resources: BTreeMap::new(),
            data_sources: BTreeMap::new(),
        }
    }
}

impl BridgeConfig {
    /// Loads configuration from an explicit path.
    ///
    /// A missing file yields the default configuration. A file that exists
    /// but does not parse is a structural error.
    pub fn load_from(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No bridge config found at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        info!(
            resources = config.resources.len(),
            data_sources = config.data_sources.len(),
            "Loaded bridge config from {:?}",
            path
        );
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> SchemaResult<Self> {
        toml::from_str(contents).map_err(|e| SchemaError::Config(e.to_string()))
    }

    /// Returns the overrides for a managed resource, if any.
    pub fn resource(&self, token: &str) -> Option<&ResourceOverrides> {
        self.resources.get(token)
    }

    pub fn data_source(&self, token: &str) -> Option<&ResourceOverrides> {
        self.data_sources.get(token)
    }

    /// Adds a field override, creating the resource entry if needed.
    pub fn override_field(&mut self, token: &str, path: &str, field: FieldOverride) -> &mut Self {
        self.resources
            .entry(token.to_string())
            .or_default()
            .fields
            .insert(path.to_string(), field);
        self
    }
}
