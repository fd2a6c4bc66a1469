use crate::{UpgradeError, UpgradeResult};
use std::fmt;
use tether_convert::decode_raw_state;
use tether_schema::ResourceSchema;
use tether_types::{ForeignValue, RawState};
use tracing::debug;

/// The operation that read persisted state back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeEntry {
    Refresh,
    Diff,
    Update,
    Delete,
    Import,
}

impl fmt::Display for UpgradeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpgradeEntry::Refresh => "refresh",
            UpgradeEntry::Diff => "diff",
            UpgradeEntry::Update => "update",
            UpgradeEntry::Delete => "delete",
            UpgradeEntry::Import => "import",
        };
        f.write_str(name)
    }
}

/// Upgrades persisted state of one resource to its current schema version.
///
/// States move strictly one version at a time:
/// `stored@V -> stored@V+1 -> ... -> stored@current`.
#[derive(Debug, Clone, Copy)]
pub struct UpgradePipeline<'a> {
    schema: &'a ResourceSchema,
}

impl<'a> UpgradePipeline<'a> {
    #[must_use]
    pub fn new(schema: &'a ResourceSchema) -> Self {
        Self { schema }
    }

    /// True when `raw` is not at the current version.
    #[must_use]
    pub fn needs_upgrade(&self, raw: &RawState) -> bool {
        raw.version != self.schema.version || self.schema.pre_upgrade_hook.is_some()
    }

    /// Runs the pre-upgrade hook, then every upgrader between the stored and
    /// the current version.
    ///
    /// The whole chain is checked before the first upgrader runs; a gap fails
    /// with [`UpgradeError::MissingUpgrader`] without touching the state.
    pub fn upgrade(&self, entry: UpgradeEntry, raw: RawState) -> UpgradeResult<RawState> {
        let token = &self.schema.token;
        let current = self.schema.version;
        let RawState { mut version, mut state } = raw;

        if let Some(hook) = &self.schema.pre_upgrade_hook {
            let stored = version;
            (version, state) = hook
                .before_upgrade(version, state)
                .map_err(|message| UpgradeError::Hook {
                    token: token.clone(),
                    message,
                })?;
            debug!(token = %token, %entry, from = stored, to = version, "Ran pre-upgrade hook");
        }

        if version > current {
            return Err(UpgradeError::Downgrade {
                token: token.clone(),
                stored: version,
                current,
            });
        }
        if let Some(from) = (version..current).find(|v| !self.schema.upgraders.contains_key(v)) {
            return Err(UpgradeError::MissingUpgrader {
                token: token.clone(),
                from,
                current,
            });
        }

        for (&from, upgrader) in self.schema.upgraders.range(version..current) {
            state = upgrader
                .upgrade(state)
                .map_err(|message| UpgradeError::Upgrader {
                    token: token.clone(),
                    from,
                    message,
                })?;
            if !state.is_object() {
                return Err(UpgradeError::Upgrader {
                    token: token.clone(),
                    from,
                    message: "upgrader must return an object".to_string(),
                });
            }
            debug!(token = %token, %entry, from, to = from + 1, "Upgraded state");
        }

        Ok(RawState::new(current, state))
    }

    /// Upgrades `raw` and decodes it against the current schema.
    pub fn upgrade_and_decode(&self, entry: UpgradeEntry, raw: RawState) -> UpgradeResult<ForeignValue> {
        let upgraded = self.upgrade(entry, raw)?;
        Ok(decode_raw_state(self.schema, &upgraded)?)
    }
}
