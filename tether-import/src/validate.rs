use crate::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use tether_convert::{ExtractMode, OutputContext, extract_inputs_from_outputs, to_destination};
use tether_schema::{ResourceSchema, SchemaNode};
use tether_types::{ForeignValue, PropertyMap, PropertyPath};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The attribute was dropped; the import is still usable.
    Warning,
    /// The attribute was kept with a value its validator rejects.
    Error,
}

/// One validation failure found during import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDiagnostic {
    /// Destination path of the attribute.
    pub path: PropertyPath,
    pub severity: Severity,
    /// The validator's message, verbatim.
    pub message: String,
}

/// Result of [`import_inputs`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOutcome {
    /// Inputs for the generated configuration, keyed by destination name.
    pub inputs: PropertyMap,
    /// Outputs of the imported resource after dropping failed attributes.
    pub outputs: PropertyMap,
    pub dropped: Vec<PropertyPath>,
    pub diagnostics: Vec<ImportDiagnostic>,
}

impl ImportOutcome {
    /// True if any kept attribute failed validation.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }
}

/// Validates imported foreign state and derives inputs from it.
///
/// `state` is the provider's read of the resource, already upgraded to the
/// current schema version.
pub fn import_inputs(
    schema: &ResourceSchema,
    state: &ForeignValue,
    ctx: &OutputContext<'_>,
) -> ImportResult<ImportOutcome> {
    let ForeignValue::Map(attributes) = state else {
        return Err(ImportError::InvalidState(state.type_name()));
    };

    let mut kept = attributes.clone();
    let mut outcome = ImportOutcome::default();
    for field in schema.fields() {
        let Some(value) = attributes.get(&field.foreign_name) else {
            continue;
        };
        let node = schema.node(field.node);
        let Err(message) = validate_attribute(schema, node, value) else {
            continue;
        };

        let path = PropertyPath::root(field.destination_name.as_str());
        if node.computed && !node.required {
            warn!(
                token = %schema.token,
                path = %path,
                error = %message,
                "Dropping imported attribute that failed validation"
            );
            kept.remove(&field.foreign_name);
            outcome.dropped.push(path.clone());
            outcome.diagnostics.push(ImportDiagnostic {
                path,
                severity: Severity::Warning,
                message,
            });
        } else {
            outcome.diagnostics.push(ImportDiagnostic {
                path,
                severity: Severity::Error,
                message,
            });
        }
    }

    outcome.outputs = to_destination(schema, &ForeignValue::Map(kept), ctx)?;
    outcome.inputs = extract_inputs_from_outputs(schema, &outcome.outputs, None, ExtractMode::Import)?;
    debug!(
        token = %schema.token,
        inputs = outcome.inputs.len(),
        dropped = outcome.dropped.len(),
        "Imported resource"
    );
    Ok(outcome)
}

/// Runs the attribute's validator and, for collections of scalars, the
/// element validator on every element. Null and unknown values are not
/// validated.
fn validate_attribute(schema: &ResourceSchema, node: &SchemaNode, value: &ForeignValue) -> Result<(), String> {
    if value.is_null() || value.is_unknown() {
        return Ok(());
    }
    if let Some(validator) = &node.validator {
        validator.validate(value)?;
    }
    let Some(elem) = node.element().map(|id| schema.node(id)) else {
        return Ok(());
    };
    if !elem.is_scalar() {
        return Ok(());
    }
    let (Some(validator), Some(items)) = (&elem.validator, value.as_elements()) else {
        return Ok(());
    };
    for item in items {
        if !item.is_null() && !item.is_unknown() {
            validator.validate(item)?;
        }
    }
    Ok(())
}
