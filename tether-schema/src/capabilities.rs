//! Provider-supplied callbacks, passed to the schema builder at construction.
//!
//! Each hook is a small trait with a blanket impl for closures, so providers
//! can register either a type or a plain `Fn`. Hooks are keyed by the resource
//! token and, for per-attribute hooks, by a foreign attribute path such as
//! `rule[*].port` (`[*]` steps into a collection element).
//!
//! Hooks report failures as `Err(String)`; the message is carried verbatim
//! into whichever error or diagnostic surfaces it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tether_types::{ForeignValue, PropertyMap};

/// Explicit identity (hash) function for set elements.
pub trait SetHash: Send + Sync {
    fn hash(&self, element: &ForeignValue) -> i64;
}

impl<F> SetHash for F
where
    F: Fn(&ForeignValue) -> i64 + Send + Sync,
{
    fn hash(&self, element: &ForeignValue) -> i64 {
        self(element)
    }
}

/// Attribute validator. Return `Err(message)` to reject a value.
pub trait Validator: Send + Sync {
    fn validate(&self, value: &ForeignValue) -> Result<(), String>;
}

impl<F> Validator for F
where
    F: Fn(&ForeignValue) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, value: &ForeignValue) -> Result<(), String> {
        self(value)
    }
}

/// Value transform the foreign provider applies before storing an input
/// (for example, normalizing or hashing a document).
pub trait StateFunc: Send + Sync {
    fn apply(&self, value: &ForeignValue) -> ForeignValue;
}

impl<F> StateFunc for F
where
    F: Fn(&ForeignValue) -> ForeignValue + Send + Sync,
{
    fn apply(&self, value: &ForeignValue) -> ForeignValue {
        self(value)
    }
}

/// Produces a default for an absent optional input.
pub trait DefaultFunc: Send + Sync {
    fn default_value(&self) -> Result<ForeignValue, String>;
}

impl<F> DefaultFunc for F
where
    F: Fn() -> Result<ForeignValue, String> + Send + Sync,
{
    fn default_value(&self) -> Result<ForeignValue, String> {
        self()
    }
}

/// Migrates raw state from one schema version to the next.
pub trait StateUpgrader: Send + Sync {
    fn upgrade(&self, state: serde_json::Value) -> Result<serde_json::Value, String>;
}

impl<F> StateUpgrader for F
where
    F: Fn(serde_json::Value) -> Result<serde_json::Value, String> + Send + Sync,
{
    fn upgrade(&self, state: serde_json::Value) -> Result<serde_json::Value, String> {
        self(state)
    }
}

/// Runs before the upgrade chain and may rewrite both the state and the
/// version it claims to be at.
pub trait PreUpgradeHook: Send + Sync {
    fn before_upgrade(
        &self,
        version: u64,
        state: serde_json::Value,
    ) -> Result<(u64, serde_json::Value), String>;
}

impl<F> PreUpgradeHook for F
where
    F: Fn(u64, serde_json::Value) -> Result<(u64, serde_json::Value), String> + Send + Sync,
{
    fn before_upgrade(
        &self,
        version: u64,
        state: serde_json::Value,
    ) -> Result<(u64, serde_json::Value), String> {
        self(version, state)
    }
}

/// Input to a [`StateEditHook`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStateEditRequest {
    pub token: String,
    pub proposed_inputs: PropertyMap,
    pub provider_config: PropertyMap,
    pub planned_state: ForeignValue,
}

/// Escape hatch that may replace the planned state before it is diffed and
/// persisted.
pub trait StateEditHook: Send + Sync {
    fn edit(&self, request: PlanStateEditRequest) -> Result<ForeignValue, String>;
}

impl<F> StateEditHook for F
where
    F: Fn(PlanStateEditRequest) -> Result<ForeignValue, String> + Send + Sync,
{
    fn edit(&self, request: PlanStateEditRequest) -> Result<ForeignValue, String> {
        self(request)
    }
}

/// Hooks registered for one resource or data source.
#[derive(Clone, Default)]
pub struct ResourceCapabilities {
    pub set_hashes: BTreeMap<String, Arc<dyn SetHash>>,
    pub validators: BTreeMap<String, Arc<dyn Validator>>,
    pub state_funcs: BTreeMap<String, Arc<dyn StateFunc>>,
    pub default_funcs: BTreeMap<String, Arc<dyn DefaultFunc>>,
    /// Keyed by the version the upgrader migrates *from*.
    pub upgraders: BTreeMap<u64, Arc<dyn StateUpgrader>>,
    pub pre_upgrade_hook: Option<Arc<dyn PreUpgradeHook>>,
    pub state_edit_hook: Option<Arc<dyn StateEditHook>>,
}

impl ResourceCapabilities {
    pub fn set_hash(&mut self, path: &str, hash: impl SetHash + 'static) -> &mut Self {
        self.set_hashes.insert(path.to_string(), Arc::new(hash));
        self
    }

    pub fn validator(&mut self, path: &str, validator: impl Validator + 'static) -> &mut Self {
        self.validators.insert(path.to_string(), Arc::new(validator));
        self
    }

    pub fn state_func(&mut self, path: &str, func: impl StateFunc + 'static) -> &mut Self {
        self.state_funcs.insert(path.to_string(), Arc::new(func));
        self
    }

    pub fn default_func(&mut self, path: &str, func: impl DefaultFunc + 'static) -> &mut Self {
        self.default_funcs.insert(path.to_string(), Arc::new(func));
        self
    }

    /// Registers the upgrader that migrates state written at `from_version`.
    pub fn upgrader(&mut self, from_version: u64, upgrader: impl StateUpgrader + 'static) -> &mut Self {
        self.upgraders.insert(from_version, Arc::new(upgrader));
        self
    }

    pub fn pre_upgrade_hook(&mut self, hook: impl PreUpgradeHook + 'static) -> &mut Self {
        self.pre_upgrade_hook = Some(Arc::new(hook));
        self
    }

    pub fn state_edit_hook(&mut self, hook: impl StateEditHook + 'static) -> &mut Self {
        self.state_edit_hook = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for ResourceCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCapabilities")
            .field("set_hashes", &self.set_hashes.keys().collect::<Vec<_>>())
            .field("validators", &self.validators.keys().collect::<Vec<_>>())
            .field("state_funcs", &self.state_funcs.keys().collect::<Vec<_>>())
            .field("default_funcs", &self.default_funcs.keys().collect::<Vec<_>>())
            .field("upgraders", &self.upgraders.keys().collect::<Vec<_>>())
            .field("pre_upgrade_hook", &self.pre_upgrade_hook.is_some())
            .field("state_edit_hook", &self.state_edit_hook.is_some())
            .finish()
    }
}

/// All provider callbacks, by resource or data source token.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    resources: BTreeMap<String, ResourceCapabilities>,
}

impl Capabilities {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the hooks for `token`, creating an empty entry if needed.
    pub fn resource(&mut self, token: &str) -> &mut ResourceCapabilities {
        self.resources.entry(token.to_string()).or_default()
    }

    pub fn get(&self, token: &str) -> Option<&ResourceCapabilities> {
        self.resources.get(token)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }
}
