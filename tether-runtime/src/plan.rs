//! Planned state: what the foreign state will be once an operation applies.

use crate::{RuntimeError, RuntimeResult};
use tether_convert::{InputOptions, apply_state_funcs, to_foreign};
use tether_schema::{PlanStateEditRequest, ResourceSchema};
use tether_types::{ForeignValue, PropertyMap};
use tracing::debug;

/// Result of [`ResourceBridge::plan`](crate::ResourceBridge::plan).
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedState {
    /// Planned foreign state, as it will be handed to create or update.
    pub state: ForeignValue,
    /// The planned state as destination properties. Values the provider has
    /// yet to compute are `Computed`.
    pub outputs: PropertyMap,
}

/// Computes the planned foreign state.
///
/// Defaults already present in prior state are reused rather than resolved
/// again. Inputs are converted and run through the state functions exactly once;
/// prior state is already transformed and is carried over untouched. Computed
/// attributes the inputs leave unset keep their prior value, or become unknown
/// when there is no prior state. The state-edit hook sees the result last.
pub(crate) fn plan_state(
    schema: &ResourceSchema,
    prior: Option<&ForeignValue>,
    inputs: &PropertyMap,
    provider_config: &PropertyMap,
    apply_defaults: bool,
) -> RuntimeResult<ForeignValue> {
    let mut options = InputOptions::new(apply_defaults);
    if let Some(prior) = prior {
        options = options.with_prior(prior);
    }
    let proposed = to_foreign(schema, inputs, &options)?;
    let mut planned = apply_state_funcs(schema, &proposed)
        .as_map()
        .cloned()
        .unwrap_or_default();

    for field in schema.fields() {
        if !schema.node(field.node).computed || planned.contains_key(&field.foreign_name) {
            continue;
        }
        let carried = match prior {
            Some(prior) => prior.get(&field.foreign_name).cloned(),
            None => Some(ForeignValue::Unknown),
        };
        if let Some(value) = carried {
            planned.insert(field.foreign_name.clone(), value);
        }
    }

    let planned = ForeignValue::Map(planned);
    let Some(hook) = &schema.state_edit_hook else {
        return Ok(planned);
    };
    let request = PlanStateEditRequest {
        token: schema.token.clone(),
        proposed_inputs: inputs.clone(),
        provider_config: provider_config.clone(),
        planned_state: planned,
    };
    let edited = hook.edit(request).map_err(|message| RuntimeError::StateEdit {
        token: schema.token.clone(),
        message,
    })?;
    debug!(token = %schema.token, "Applied state-edit hook to planned state");
    Ok(edited)
}
