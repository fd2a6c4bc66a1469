use serde::{Deserialize, Serialize};
use tether_types::{PropertyPath, PropertyValue};

/// Kind of change at one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiffKind {
    Same,
    Add,
    Delete,
    Update,
    AddReplace,
    DeleteReplace,
    UpdateReplace,
}

impl DiffKind {
    #[must_use]
    pub fn is_change(self) -> bool {
        self != DiffKind::Same
    }

    #[must_use]
    pub fn is_replace(self) -> bool {
        matches!(
            self,
            DiffKind::AddReplace | DiffKind::DeleteReplace | DiffKind::UpdateReplace
        )
    }

    /// The replacing form of this kind. `Same` stays `Same`.
    #[must_use]
    pub fn replacing(self) -> Self {
        match self {
            DiffKind::Add => DiffKind::AddReplace,
            DiffKind::Delete => DiffKind::DeleteReplace,
            DiffKind::Update => DiffKind::UpdateReplace,
            other => other,
        }
    }

    /// The in-place form of this kind.
    #[must_use]
    pub fn in_place(self) -> Self {
        match self {
            DiffKind::AddReplace => DiffKind::Add,
            DiffKind::DeleteReplace => DiffKind::Delete,
            DiffKind::UpdateReplace => DiffKind::Update,
            other => other,
        }
    }
}

/// One change, addressed by destination property path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffRecord {
    pub path: PropertyPath,
    pub kind: DiffKind,
    pub old: PropertyValue,
    pub new: PropertyValue,
}

impl DiffRecord {
    #[must_use]
    pub fn new(path: PropertyPath, kind: DiffKind, old: PropertyValue, new: PropertyValue) -> Self {
        Self { path, kind, old, new }
    }
}

/// Outcome of [`crate::diff`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Records in walk order: top-level properties sorted by name, children
    /// after their parent.
    pub records: Vec<DiffRecord>,
    pub has_changes: bool,
    /// At least one record requires replacing the resource.
    pub replace: bool,
    /// The replacement must delete the old resource before creating the new one.
    pub delete_before_replace: bool,
}

impl DiffResult {
    pub(crate) fn from_records(records: Vec<DiffRecord>, delete_before_replace: bool) -> Self {
        let has_changes = records.iter().any(|r| r.kind.is_change());
        let replace = records.iter().any(|r| r.kind.is_replace());
        Self {
            records,
            has_changes,
            replace,
            delete_before_replace: replace && delete_before_replace,
        }
    }

    /// Records that are not [`DiffKind::Same`].
    pub fn changes(&self) -> impl Iterator<Item = &DiffRecord> {
        self.records.iter().filter(|r| r.kind.is_change())
    }

    /// The record at exactly `path`, if any.
    pub fn get(&self, path: &str) -> Option<&DiffRecord> {
        self.records.iter().find(|r| r.path.to_string() == path)
    }

    /// Top-level properties with at least one replacing change, sorted.
    #[must_use]
    pub fn replace_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .records
            .iter()
            .filter(|r| r.kind.is_replace())
            .filter_map(|r| r.path.top_level_key().map(str::to_string))
            .collect();
        keys.dedup();
        keys
    }
}
