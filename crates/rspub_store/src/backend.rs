//! Store backend trait definition.

use crate::error::StoreResult;
use crate::lock::StoreLock;
use rspub_model::ConfigId;

/// A blob store partitioned by configuration.
///
/// Backends are **opaque byte stores**. The state store owns all format
/// interpretation.
///
/// # Invariants
///
/// - `replace` is atomic: a reader sees either the old or the new blob,
///   never a mix, even after a crash
/// - `replace` is durable when it returns
/// - `try_lock` grants at most one live [`StoreLock`] per configuration
/// - Backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait StoreBackend: Send + Sync {
    /// Reads a blob. Returns `None` if it was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn read(&self, config: &ConfigId, name: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Atomically and durably replaces a blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails. The previous blob is then left
    /// intact.
    fn replace(&self, config: &ConfigId, name: &str, data: &[u8]) -> StoreResult<()>;

    /// Removes a blob. Returns true if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn remove(&self, config: &ConfigId, name: &str) -> StoreResult<bool>;

    /// Lists configurations that hold at least one blob, in id order.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    fn configs(&self) -> StoreResult<Vec<ConfigId>>;

    /// Takes the exclusive run lock of a configuration without blocking.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Locked` if the lock is held elsewhere.
    fn try_lock(&self, config: &ConfigId) -> StoreResult<StoreLock>;
}
