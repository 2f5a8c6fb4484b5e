//! Change records produced by the diff engine.

use crate::resource::ResourceDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of change between two runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Resource appeared since the previous state.
    Created,
    /// Resource content changed.
    Updated,
    /// Resource disappeared.
    Deleted,
}

impl ChangeKind {
    /// Returns the protocol name of the change.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Updated => "updated",
            ChangeKind::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single classified change.
///
/// `old` is present for updates and deletes, `new` for creates and updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Identity of the changed resource.
    pub identity: String,
    /// What happened to it.
    pub kind: ChangeKind,
    /// Descriptor from the previous state.
    pub old: Option<ResourceDescriptor>,
    /// Descriptor from the current scan.
    pub new: Option<ResourceDescriptor>,
}

impl ChangeRecord {
    /// Creates a `created` record.
    pub fn created(new: ResourceDescriptor) -> Self {
        Self {
            identity: new.identity.clone(),
            kind: ChangeKind::Created,
            old: None,
            new: Some(new),
        }
    }

    /// Creates an `updated` record.
    pub fn updated(old: ResourceDescriptor, new: ResourceDescriptor) -> Self {
        Self {
            identity: new.identity.clone(),
            kind: ChangeKind::Updated,
            old: Some(old),
            new: Some(new),
        }
    }

    /// Creates a `deleted` record.
    pub fn deleted(old: ResourceDescriptor) -> Self {
        Self {
            identity: old.identity.clone(),
            kind: ChangeKind::Deleted,
            old: Some(old),
            new: None,
        }
    }

    /// Returns the descriptor that best represents the resource now.
    #[must_use]
    pub fn descriptor(&self) -> Option<&ResourceDescriptor> {
        self.new.as_ref().or(self.old.as_ref())
    }
}

/// Counts of a diff outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    /// Number of created resources.
    pub created: usize,
    /// Number of updated resources.
    pub updated: usize,
    /// Number of deleted resources.
    pub deleted: usize,
    /// Number of unchanged resources.
    pub unchanged: usize,
}

impl ChangeSummary {
    /// Total number of change records.
    #[must_use]
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_changes() == 0
    }

    /// Counts one record.
    pub fn record(&mut self, kind: ChangeKind) {
        match kind {
            ChangeKind::Created => self.created += 1,
            ChangeKind::Updated => self.updated += 1,
            ChangeKind::Deleted => self.deleted += 1,
        }
    }
}
