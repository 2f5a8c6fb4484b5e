//! Synchronization documents and the capability index.

use crate::change::ChangeRecord;
use crate::resource::ResourceDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

/// Kind of synchronization document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Full baseline listing.
    Resourcelist,
    /// Incremental change listing.
    Changelist,
}

impl DocumentKind {
    /// Returns the capability name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Resourcelist => "resourcelist",
            DocumentKind::Changelist => "changelist",
        }
    }

    /// File name of the index document for this kind.
    #[must_use]
    pub fn index_file_name(&self) -> String {
        format!("{}-index.xml", self.as_str())
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a document: a generation and a sequence within it.
///
/// A generation starts whenever a chain is restarted (new baseline or new
/// changelist series); sequences restart at 1 inside it. Ids compare
/// lexicographically, so every issued id is strictly greater than all ids
/// issued before it for the same configuration.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DocumentId {
    /// Chain generation.
    pub generation: u64,
    /// Sequence number inside the generation, starting at 1.
    pub sequence: u64,
}

impl DocumentId {
    /// Creates a document id.
    #[must_use]
    pub const fn new(generation: u64, sequence: u64) -> Self {
        Self {
            generation,
            sequence,
        }
    }

    /// The id following this one in the same generation.
    #[must_use]
    pub fn next(&self) -> Self {
        Self::new(self.generation, self.sequence + 1)
    }

    /// The first id of the following generation.
    #[must_use]
    pub fn next_generation(&self) -> Self {
        Self::new(self.generation + 1, 1)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.generation, self.sequence)
    }
}

/// Links from a document to its neighbours in the capability chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLinks {
    /// Previous document of the same kind in the chain.
    pub previous: Option<String>,
    /// Next document of the same kind written by the same run.
    pub next: Option<String>,
    /// Index document listing all live documents of this kind.
    pub index: Option<String>,
    /// The capability list the document belongs to.
    pub up: Option<String>,
}

/// A single entry of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentEntry {
    /// A resource listed by a resourcelist.
    Resource(ResourceDescriptor),
    /// A change listed by a changelist.
    Change(ChangeRecord),
}

impl DocumentEntry {
    /// Identity of the resource this entry describes.
    #[must_use]
    pub fn identity(&self) -> &str {
        match self {
            DocumentEntry::Resource(r) => &r.identity,
            DocumentEntry::Change(c) => &c.identity,
        }
    }
}

/// Description of a document handed to the document writer.
///
/// The engine decides content, numbering and links; the writer owns the
/// byte-level format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    /// Document kind.
    pub kind: DocumentKind,
    /// Document id.
    pub id: DocumentId,
    /// File name inside the output location.
    pub file_name: String,
    /// Published URI.
    pub uri: String,
    /// Ordered entries.
    pub entries: Vec<DocumentEntry>,
    /// Chain links.
    pub links: DocumentLinks,
    /// When production of the document started.
    pub at: SystemTime,
    /// When production of the document completed.
    pub completed: SystemTime,
    /// For changelists: the moment changes are listed from.
    pub from: Option<SystemTime>,
}

impl DocumentDescriptor {
    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the document has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resource entries of a resourcelist.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.entries.iter().filter_map(|entry| match entry {
            DocumentEntry::Resource(r) => Some(r),
            DocumentEntry::Change(_) => None,
        })
    }

    /// Change entries of a changelist.
    pub fn changes(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.entries.iter().filter_map(|entry| match entry {
            DocumentEntry::Change(c) => Some(c),
            DocumentEntry::Resource(_) => None,
        })
    }

    /// Reference to this document for the capability index.
    #[must_use]
    pub fn to_ref(&self) -> DocumentRef {
        DocumentRef {
            kind: self.kind,
            id: self.id,
            uri: self.uri.clone(),
            entries: self.entries.len(),
            completed: self.completed,
        }
    }
}

/// Compact reference to a published document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Document kind.
    pub kind: DocumentKind,
    /// Document id.
    pub id: DocumentId,
    /// Published URI.
    pub uri: String,
    /// Number of entries.
    pub entries: usize,
    /// Completion time.
    pub completed: SystemTime,
}

/// Live documents per kind, latest last.
///
/// This is what transport components read to advertise the synchronization
/// endpoint. Restarting a chain replaces the list for that kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityIndex {
    documents: BTreeMap<DocumentKind, Vec<DocumentRef>>,
}

impl CapabilityIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest document of a kind.
    #[must_use]
    pub fn latest(&self, kind: DocumentKind) -> Option<&DocumentRef> {
        self.documents.get(&kind).and_then(|docs| docs.last())
    }

    /// Latest document across all kinds, by id.
    #[must_use]
    pub fn latest_overall(&self) -> Option<&DocumentRef> {
        self.documents
            .values()
            .filter_map(|docs| docs.last())
            .max_by_key(|doc| doc.id)
    }

    /// All live documents of a kind.
    #[must_use]
    pub fn documents(&self, kind: DocumentKind) -> &[DocumentRef] {
        self.documents.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replaces the live documents of a kind.
    pub fn replace(&mut self, kind: DocumentKind, documents: Vec<DocumentRef>) {
        if documents.is_empty() {
            self.documents.remove(&kind);
        } else {
            self.documents.insert(kind, documents);
        }
    }

    /// Appends documents to a kind's chain.
    pub fn append(&mut self, kind: DocumentKind, documents: impl IntoIterator<Item = DocumentRef>) {
        self.documents.entry(kind).or_default().extend(documents);
    }

    /// Forgets every document of a kind.
    pub fn clear(&mut self, kind: DocumentKind) {
        self.documents.remove(&kind);
    }

    /// Maps each kind to the URI of its latest document.
    #[must_use]
    pub fn latest_uris(&self) -> BTreeMap<DocumentKind, String> {
        self.documents
            .iter()
            .filter_map(|(kind, docs)| docs.last().map(|d| (*kind, d.uri.clone())))
            .collect()
    }

    /// Returns true if no document was published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
