use crate::{ForeignProvider, RuntimeError, RuntimeResult};
use tether_convert::{InputOptions, OutputContext, StateOrigin, to_destination, to_foreign};
use tether_schema::ProviderSchema;
use tether_types::PropertyMap;
use tracing::{debug, warn};

/// Runs read-only lookups against a foreign provider.
///
/// Sensitive results are wrapped as secrets exactly as they are for managed
/// resources.
pub struct DataSourceBridge<'a> {
    schema: &'a ProviderSchema,
    provider: &'a dyn ForeignProvider,
}

impl<'a> DataSourceBridge<'a> {
    pub fn new(schema: &'a ProviderSchema, provider: &'a dyn ForeignProvider) -> Self {
        Self { schema, provider }
    }

    /// Invokes the data source `token` with `args` and returns its result.
    pub fn invoke(&self, token: &str, args: &PropertyMap) -> RuntimeResult<PropertyMap> {
        let schema = self
            .schema
            .data_source(token)
            .ok_or_else(|| RuntimeError::UnknownToken(token.to_string()))?;
        let options = InputOptions::new(self.schema.apply_defaults);
        let foreign_args = to_foreign(schema, args, &options)?;

        let result = self
            .provider
            .read_data_source(token, &foreign_args)
            .map_err(|message| {
                warn!(token = %token, error = %message, "Data source lookup failed");
                RuntimeError::Foreign {
                    token: token.to_string(),
                    operation: "read",
                    message,
                }
            })?;

        let ctx = OutputContext::new(StateOrigin::Read)
            .with_inputs(args)
            .with_secrets(self.schema.supports_secrets);
        let outputs = to_destination(schema, &result, &ctx)?;
        debug!(token = %token, "Invoked data source");
        Ok(outputs)
    }
}
