use tether_types::{ForeignValue, RawState};

/// The foreign provider's resource handlers.
///
/// The bridge treats these as opaque. Values passed in and out are typed by
/// the provider's own schema; failures are plain messages that the bridge
/// reports without rewording.
pub trait ForeignProvider: Send + Sync {
    /// Creates a resource from its planned state and returns the state the
    /// provider stored. Unknown values in `planned` are for the provider to fill.
    fn create(&self, token: &str, planned: &ForeignValue) -> Result<ForeignValue, String>;

    /// Reads the live state of a resource. `Ok(None)` means it no longer exists.
    fn read(&self, token: &str, state: &ForeignValue) -> Result<Option<ForeignValue>, String>;

    fn update(
        &self,
        token: &str,
        prior: &ForeignValue,
        planned: &ForeignValue,
    ) -> Result<ForeignValue, String>;

    fn delete(&self, token: &str, state: &ForeignValue) -> Result<(), String>;

    /// Looks up an existing resource by its provider id. The state may have
    /// been written under any schema version.
    fn import(&self, token: &str, id: &str) -> Result<Option<RawState>, String> {
        let _ = id;
        Err(format!("{token} does not support import"))
    }

    /// Runs a data source lookup.
    fn read_data_source(&self, token: &str, args: &ForeignValue) -> Result<ForeignValue, String> {
        let _ = args;
        Err(format!("{token} is not a data source"))
    }
}
