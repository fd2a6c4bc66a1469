use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Persisted foreign state: an opaque JSON document plus the schema version it
/// was written under.
///
/// Only the state upgrade pipeline looks inside `state`; everything else treats
/// it as a round-trip blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawState {
    #[serde(default)]
    pub version: u64,
    pub state: serde_json::Value,
}

impl RawState {
    pub fn new(version: u64, state: serde_json::Value) -> Self {
        Self { version, state }
    }

    /// Parses a persisted `{"version": .., "state": {..}}` document.
    ///
    /// The state must be a JSON object; anything else cannot have come from a
    /// foreign read or create call.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: RawState = serde_json::from_slice(bytes)?;
        if !raw.state.is_object() {
            return Err(Error::InvalidRawState(format!(
                "state must be an object, got {}",
                json_kind(&raw.state)
            )));
        }
        Ok(raw)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
