//! In-memory store backend for testing.

use crate::backend::StoreBackend;
use crate::error::StoreResult;
use crate::lock::StoreLock;
use crate::StoreError;
use parking_lot::{Mutex, RwLock};
use rspub_model::ConfigId;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::Arc;

type BlobKey = (ConfigId, String);

/// An in-memory store backend.
///
/// Suitable for unit and integration tests. Writes to a named blob can be
/// made to fail a number of times to simulate crashes and full disks: a
/// failed `replace` leaves the previous blob intact, exactly like an
/// interrupted write-then-rename on disk.
///
/// # Example
///
/// ```rust
/// use rspub_model::ConfigId;
/// use rspub_store::{InMemoryBackend, StoreBackend};
///
/// let backend = InMemoryBackend::new();
/// let config = ConfigId::new("c").unwrap();
/// backend.replace(&config, "state", b"data").unwrap();
/// assert_eq!(backend.read(&config, "state").unwrap().unwrap(), b"data");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    blobs: RwLock<BTreeMap<BlobKey, Vec<u8>>>,
    locks: Arc<Mutex<BTreeSet<ConfigId>>>,
    faults: Mutex<BTreeMap<String, usize>>,
    replaces: Mutex<usize>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` replaces of blob `name` fail.
    pub fn fail_replaces(&self, name: &str, count: usize) {
        self.faults.lock().insert(name.to_string(), count);
    }

    /// Removes every injected fault.
    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    /// Number of successful replaces so far.
    #[must_use]
    pub fn replace_count(&self) -> usize {
        *self.replaces.lock()
    }

    /// Returns true if a run lock is held for `config`.
    #[must_use]
    pub fn is_locked(&self, config: &ConfigId) -> bool {
        self.locks.lock().contains(config)
    }

    fn take_fault(&self, name: &str) -> bool {
        let mut faults = self.faults.lock();
        match faults.get_mut(name) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

impl StoreBackend for InMemoryBackend {
    fn read(&self, config: &ConfigId, name: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self
            .blobs
            .read()
            .get(&(config.clone(), name.to_string()))
            .cloned())
    }

    fn replace(&self, config: &ConfigId, name: &str, data: &[u8]) -> StoreResult<()> {
        if self.take_fault(name) {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("injected write failure for blob '{name}'"),
            )));
        }
        self.blobs
            .write()
            .insert((config.clone(), name.to_string()), data.to_vec());
        *self.replaces.lock() += 1;
        Ok(())
    }

    fn remove(&self, config: &ConfigId, name: &str) -> StoreResult<bool> {
        Ok(self
            .blobs
            .write()
            .remove(&(config.clone(), name.to_string()))
            .is_some())
    }

    fn configs(&self) -> StoreResult<Vec<ConfigId>> {
        let configs: BTreeSet<ConfigId> = self
            .blobs
            .read()
            .keys()
            .map(|(config, _)| config.clone())
            .collect();
        Ok(configs.into_iter().collect())
    }

    fn try_lock(&self, config: &ConfigId) -> StoreResult<StoreLock> {
        if !self.locks.lock().insert(config.clone()) {
            return Err(StoreError::Locked {
                config: config.to_string(),
            });
        }
        Ok(StoreLock::table(config.clone(), Arc::clone(&self.locks)))
    }
}
