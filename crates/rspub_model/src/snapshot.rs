//! Snapshots of published resource state.

use crate::change::{ChangeKind, ChangeRecord};
use crate::document::DocumentId;
use crate::resource::ResourceDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A resource as last published, with the document that described it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// The descriptor as of the last published document.
    pub descriptor: ResourceDescriptor,
    /// Document that last described this resource.
    pub document: DocumentId,
}

/// Identity-ordered record of the last published state of a configuration.
///
/// The snapshot is the diff baseline for the next run. It is owned by the
/// state store and only ever replaced as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    entries: BTreeMap<String, SnapshotEntry>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a snapshot where every resource was described by `document`.
    pub fn from_resources<'a>(
        resources: impl IntoIterator<Item = &'a ResourceDescriptor>,
        document: DocumentId,
    ) -> Self {
        let mut snapshot = Self::new();
        for resource in resources {
            snapshot.insert(resource.clone(), document);
        }
        snapshot
    }

    /// Inserts or replaces a resource.
    pub fn insert(&mut self, descriptor: ResourceDescriptor, document: DocumentId) {
        self.entries.insert(
            descriptor.identity.clone(),
            SnapshotEntry {
                descriptor,
                document,
            },
        );
    }

    /// Removes a resource, returning its entry.
    pub fn remove(&mut self, identity: &str) -> Option<SnapshotEntry> {
        self.entries.remove(identity)
    }

    /// Applies a change record described by `document`.
    pub fn apply(&mut self, record: &ChangeRecord, document: DocumentId) {
        match record.kind {
            ChangeKind::Created | ChangeKind::Updated => {
                if let Some(new) = &record.new {
                    self.insert(new.clone(), document);
                }
            }
            ChangeKind::Deleted => {
                self.remove(&record.identity);
            }
        }
    }

    /// Gets the entry for an identity.
    #[must_use]
    pub fn get(&self, identity: &str) -> Option<&SnapshotEntry> {
        self.entries.get(identity)
    }

    /// Returns true if the identity is present.
    #[must_use]
    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    /// Number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the snapshot holds no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in identity order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &SnapshotEntry)> {
        self.entries.iter()
    }

    /// Iterates descriptors in identity order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.entries.values().map(|entry| &entry.descriptor)
    }

    /// Returns true if both snapshots describe the same resources.
    ///
    /// Document ids are ignored.
    #[must_use]
    pub fn same_resources(&self, other: &Snapshot) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|((ka, a), (kb, b))| ka == kb && a.descriptor == b.descriptor)
    }
}
