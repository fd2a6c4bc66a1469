use crate::plan::{PlannedState, plan_state};
use crate::{ForeignProvider, RuntimeError, RuntimeResult};
use tether_convert::{
    ExtractMode, OutputContext, StateOrigin, encode_raw_state, extract_inputs_from_outputs,
    to_destination,
};
use tether_diff::{DiffOptions, DiffResult, diff};
use tether_import::{ImportOutcome, import_inputs};
use tether_schema::{ProviderSchema, ResourceSchema};
use tether_state::{UpgradeEntry, UpgradePipeline};
use tether_types::{ForeignValue, PropertyMap, RawState};
use tracing::{debug, info, warn};

/// Result of [`ResourceBridge::create`].
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOutcome {
    pub outputs: PropertyMap,
    /// State to persist, written at the current schema version.
    pub state: RawState,
}

/// Result of [`ResourceBridge::read`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOutcome {
    pub outputs: PropertyMap,
    /// Inputs that reproduce the observed state.
    pub inputs: PropertyMap,
    pub state: RawState,
}

/// Result of [`ResourceBridge::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub outputs: PropertyMap,
    pub state: RawState,
}

/// Result of [`ResourceBridge::import`].
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedResource {
    pub outcome: ImportOutcome,
    pub state: RawState,
}

/// Runs managed-resource operations against a foreign provider.
pub struct ResourceBridge<'a> {
    schema: &'a ProviderSchema,
    provider: &'a dyn ForeignProvider,
}

impl<'a> ResourceBridge<'a> {
    pub fn new(schema: &'a ProviderSchema, provider: &'a dyn ForeignProvider) -> Self {
        Self { schema, provider }
    }

    fn resource(&self, token: &str) -> RuntimeResult<&'a ResourceSchema> {
        self.schema
            .resource(token)
            .ok_or_else(|| RuntimeError::UnknownToken(token.to_string()))
    }

    fn context<'i>(&self, origin: StateOrigin, inputs: Option<&'i PropertyMap>) -> OutputContext<'i> {
        let ctx = OutputContext::new(origin).with_secrets(self.schema.supports_secrets);
        match inputs {
            Some(inputs) => ctx.with_inputs(inputs),
            None => ctx,
        }
    }

    fn foreign_error(token: &str, operation: &'static str, message: String) -> RuntimeError {
        warn!(token = %token, operation, error = %message, "Foreign provider call failed");
        RuntimeError::Foreign {
            token: token.to_string(),
            operation,
            message,
        }
    }

    fn upgrade(schema: &ResourceSchema, entry: UpgradeEntry, raw: &RawState) -> RuntimeResult<ForeignValue> {
        Ok(UpgradePipeline::new(schema).upgrade_and_decode(entry, raw.clone())?)
    }

    /// Plans a create (no `prior`) or an update of persisted `prior` state.
    pub fn plan(
        &self,
        token: &str,
        prior: Option<&RawState>,
        inputs: &PropertyMap,
        provider_config: &PropertyMap,
    ) -> RuntimeResult<PlannedState> {
        let schema = self.resource(token)?;
        let prior = prior
            .map(|raw| Self::upgrade(schema, UpgradeEntry::Diff, raw))
            .transpose()?;
        let state = plan_state(schema, prior.as_ref(), inputs, provider_config, self.schema.apply_defaults)?;
        let outputs = to_destination(schema, &state, &self.context(StateOrigin::Plan, Some(inputs)))?;
        Ok(PlannedState { state, outputs })
    }

    /// Creates a resource.
    ///
    /// The returned state is encoded at the current schema version directly;
    /// the upgrade pipeline is never involved.
    pub fn create(
        &self,
        token: &str,
        inputs: &PropertyMap,
        provider_config: &PropertyMap,
    ) -> RuntimeResult<CreateOutcome> {
        let schema = self.resource(token)?;
        let planned = plan_state(schema, None, inputs, provider_config, self.schema.apply_defaults)?;
        let created = self
            .provider
            .create(token, &planned)
            .map_err(|message| Self::foreign_error(token, "create", message))?;

        let outputs = to_destination(schema, &created, &self.context(StateOrigin::CreateResponse, Some(inputs)))?;
        info!(token = %token, version = schema.version, "Created resource");
        Ok(CreateOutcome {
            outputs,
            state: encode_raw_state(schema, &created),
        })
    }

    /// Refreshes persisted state. Returns `None` when the resource is gone.
    ///
    /// `old_inputs` are the inputs last applied; where they still describe the
    /// refreshed state they are returned in place of the observed values.
    pub fn read(
        &self,
        token: &str,
        prior: &RawState,
        old_inputs: Option<&PropertyMap>,
    ) -> RuntimeResult<Option<ReadOutcome>> {
        let schema = self.resource(token)?;
        let prior = Self::upgrade(schema, UpgradeEntry::Refresh, prior)?;
        let Some(current) = self
            .provider
            .read(token, &prior)
            .map_err(|message| Self::foreign_error(token, "read", message))?
        else {
            debug!(token = %token, "Resource no longer exists");
            return Ok(None);
        };

        let outputs = to_destination(schema, &current, &self.context(StateOrigin::Read, old_inputs))?;
        let inputs = extract_inputs_from_outputs(schema, &outputs, old_inputs, ExtractMode::Refresh)?;
        Ok(Some(ReadOutcome {
            outputs,
            inputs,
            state: encode_raw_state(schema, &current),
        }))
    }

    /// Compares persisted state against the state `inputs` would produce.
    ///
    /// Both sides are presented with the same inputs, so the null/empty
    /// presentation of top-level collections agrees between them.
    pub fn diff(
        &self,
        token: &str,
        prior: &RawState,
        inputs: &PropertyMap,
        provider_config: &PropertyMap,
        options: &DiffOptions,
    ) -> RuntimeResult<DiffResult> {
        let schema = self.resource(token)?;
        let prior = Self::upgrade(schema, UpgradeEntry::Diff, prior)?;
        let planned = plan_state(schema, Some(&prior), inputs, provider_config, self.schema.apply_defaults)?;

        let prior_outputs = to_destination(schema, &prior, &self.context(StateOrigin::Read, Some(inputs)))?;
        let planned_outputs = to_destination(schema, &planned, &self.context(StateOrigin::Plan, Some(inputs)))?;
        let result = diff(schema, &prior_outputs, &planned_outputs, options)?;
        debug!(
            token = %token,
            changes = result.changes().count(),
            replace = result.replace,
            "Diffed resource"
        );
        Ok(result)
    }

    pub fn update(
        &self,
        token: &str,
        prior: &RawState,
        inputs: &PropertyMap,
        provider_config: &PropertyMap,
    ) -> RuntimeResult<UpdateOutcome> {
        let schema = self.resource(token)?;
        let prior = Self::upgrade(schema, UpgradeEntry::Update, prior)?;
        let planned = plan_state(schema, Some(&prior), inputs, provider_config, self.schema.apply_defaults)?;
        let updated = self
            .provider
            .update(token, &prior, &planned)
            .map_err(|message| Self::foreign_error(token, "update", message))?;

        let outputs = to_destination(schema, &updated, &self.context(StateOrigin::Read, Some(inputs)))?;
        info!(token = %token, "Updated resource");
        Ok(UpdateOutcome {
            outputs,
            state: encode_raw_state(schema, &updated),
        })
    }

    pub fn delete(&self, token: &str, prior: &RawState) -> RuntimeResult<()> {
        let schema = self.resource(token)?;
        let prior = Self::upgrade(schema, UpgradeEntry::Delete, prior)?;
        self.provider
            .delete(token, &prior)
            .map_err(|message| Self::foreign_error(token, "delete", message))?;
        info!(token = %token, "Deleted resource");
        Ok(())
    }

    /// Imports an existing resource by provider id.
    pub fn import(&self, token: &str, id: &str) -> RuntimeResult<ImportedResource> {
        let schema = self.resource(token)?;
        let Some(raw) = self
            .provider
            .import(token, id)
            .map_err(|message| Self::foreign_error(token, "import", message))?
        else {
            return Err(RuntimeError::NotFound {
                token: token.to_string(),
                id: id.to_string(),
            });
        };

        let state = Self::upgrade(schema, UpgradeEntry::Import, &raw)?;
        let outcome = import_inputs(schema, &state, &self.context(StateOrigin::Read, None))?;
        if outcome.has_errors() {
            warn!(
                token = %token,
                id = %id,
                errors = outcome.diagnostics.len(),
                "Imported resource has invalid attributes"
            );
        }
        Ok(ImportedResource {
            outcome,
            state: encode_raw_state(schema, &state),
        })
    }
}
