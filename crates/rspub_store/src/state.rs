//! Typed access to the persisted state of a configuration.

use crate::backend::StoreBackend;
use crate::error::{StoreError, StoreResult};
use crate::lock::StoreLock;
use rspub_model::codec::{decode_envelope, encode_envelope};
use rspub_model::{CapabilityIndex, ConfigId, DocumentId, Snapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

/// Blob holding the [`PublishedState`].
pub const STATE_BLOB: &str = "state";
/// Blob holding the last issued document id.
pub const SEQUENCE_BLOB: &str = "sequence";

const STATE_MAGIC: [u8; 4] = *b"RSPS";
const STATE_VERSION: u16 = 1;
const SEQUENCE_MAGIC: [u8; 4] = *b"RSPQ";
const SEQUENCE_VERSION: u16 = 1;

/// Everything a successful run publishes, replaced as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedState {
    /// Id of the latest document written.
    pub latest: Option<DocumentId>,
    /// Resources as of the latest document.
    pub snapshot: Snapshot,
    /// Resources as of the latest resourcelist.
    pub baseline: Snapshot,
    /// Completion time of the latest resourcelist.
    pub baseline_completed: Option<SystemTime>,
    /// Live documents per kind.
    pub capability_index: CapabilityIndex,
}

/// A compare-and-save request.
#[derive(Debug, Clone)]
pub struct StateCommit {
    /// Latest document id the run loaded. `None` if there was no state.
    pub expected: Option<DocumentId>,
    /// The state to publish.
    pub state: PublishedState,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct SequenceRecord {
    last: DocumentId,
}

/// The state store.
///
/// Owns snapshots, baselines, capability indexes and document id issuance
/// for every configuration. Callers serialize runs of one configuration
/// with [`StateStore::lock`].
#[derive(Clone)]
pub struct StateStore {
    backend: Arc<dyn StoreBackend>,
}

impl StateStore {
    /// Creates a state store over a backend.
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    /// Returns the backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn StoreBackend> {
        &self.backend
    }

    /// Loads the published state, if any run has completed.
    pub fn load_state(&self, config: &ConfigId) -> StoreResult<Option<PublishedState>> {
        let Some(bytes) = self.backend.read(config, STATE_BLOB)? else {
            return Ok(None);
        };
        let (_, state) = decode_envelope(STATE_MAGIC, STATE_VERSION, &bytes)?;
        Ok(Some(state))
    }

    /// Loads the latest snapshot.
    pub fn load_snapshot(&self, config: &ConfigId) -> StoreResult<Option<Snapshot>> {
        Ok(self.load_state(config)?.map(|state| state.snapshot))
    }

    /// Loads the snapshot of the latest resourcelist.
    pub fn load_baseline(&self, config: &ConfigId) -> StoreResult<Option<Snapshot>> {
        Ok(self.load_state(config)?.map(|state| state.baseline))
    }

    /// Loads the capability index. Empty if nothing was published.
    pub fn load_capability_index(&self, config: &ConfigId) -> StoreResult<CapabilityIndex> {
        Ok(self
            .load_state(config)?
            .map(|state| state.capability_index)
            .unwrap_or_default())
    }

    /// Atomically replaces the published state.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the stored latest document id is not
    /// `commit.expected`. Nothing is written in that case.
    pub fn save_snapshot(&self, config: &ConfigId, commit: StateCommit) -> StoreResult<()> {
        let found = self.load_state(config)?.and_then(|state| state.latest);
        if found != commit.expected {
            return Err(StoreError::Conflict {
                expected: commit.expected,
                found,
            });
        }

        let bytes = encode_envelope(STATE_MAGIC, STATE_VERSION, &commit.state)?;
        self.backend.replace(config, STATE_BLOB, &bytes)?;
        debug!(
            config = %config,
            latest = ?commit.state.latest,
            resources = commit.state.snapshot.len(),
            "saved published state"
        );
        Ok(())
    }

    /// Returns the last issued document id.
    ///
    /// Never lower than the latest published document.
    pub fn last_sequence(&self, config: &ConfigId) -> StoreResult<Option<DocumentId>> {
        let issued = match self.backend.read(config, SEQUENCE_BLOB)? {
            Some(bytes) => {
                let (_, record): (u16, SequenceRecord) =
                    decode_envelope(SEQUENCE_MAGIC, SEQUENCE_VERSION, &bytes)?;
                Some(record.last)
            }
            None => None,
        };
        let published = self.load_state(config)?.and_then(|state| state.latest);
        Ok(issued.max(published))
    }

    /// Issues the next id in the current generation.
    ///
    /// The id is durable before it is returned.
    pub fn next_sequence(&self, config: &ConfigId) -> StoreResult<DocumentId> {
        let id = match self.last_sequence(config)? {
            Some(last) => last.next(),
            None => DocumentId::new(1, 1),
        };
        self.issue(config, id)
    }

    /// Opens a new generation and issues its first id.
    ///
    /// The id is durable before it is returned.
    pub fn restart_sequence(&self, config: &ConfigId) -> StoreResult<DocumentId> {
        let id = match self.last_sequence(config)? {
            Some(last) => last.next_generation(),
            None => DocumentId::new(1, 1),
        };
        self.issue(config, id)
    }

    fn issue(&self, config: &ConfigId, id: DocumentId) -> StoreResult<DocumentId> {
        let bytes = encode_envelope(SEQUENCE_MAGIC, SEQUENCE_VERSION, &SequenceRecord { last: id })?;
        self.backend.replace(config, SEQUENCE_BLOB, &bytes)?;
        debug!(config = %config, id = %id, "issued document id");
        Ok(id)
    }

    /// Takes the exclusive run lock of a configuration.
    pub fn lock(&self, config: &ConfigId) -> StoreResult<StoreLock> {
        self.backend.try_lock(config)
    }

    /// Forgets the published state so the next run starts from scratch.
    ///
    /// Issued ids are kept, so later documents still sort after earlier ones.
    pub fn clear(&self, config: &ConfigId) -> StoreResult<bool> {
        self.backend.remove(config, STATE_BLOB)
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore").finish_non_exhaustive()
    }
}
