//! Run locks.

use parking_lot::Mutex;
use rspub_model::ConfigId;
use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::sync::Arc;

/// Exclusive run lock of one configuration.
///
/// Released on drop.
pub struct StoreLock {
    config: ConfigId,
    guard: Guard,
}

enum Guard {
    /// Holds an `fs2` exclusive lock on the configuration's LOCK file.
    File(File),
    /// Entry in an in-process lock table.
    Table(Arc<Mutex<BTreeSet<ConfigId>>>),
}

impl StoreLock {
    pub(crate) fn file(config: ConfigId, file: File) -> Self {
        Self {
            config,
            guard: Guard::File(file),
        }
    }

    pub(crate) fn table(config: ConfigId, table: Arc<Mutex<BTreeSet<ConfigId>>>) -> Self {
        Self {
            config,
            guard: Guard::Table(table),
        }
    }

    /// The locked configuration.
    #[must_use]
    pub fn config(&self) -> &ConfigId {
        &self.config
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        match &self.guard {
            Guard::File(file) => {
                // Closing the handle releases the lock as well.
                let _ = fs2::FileExt::unlock(file);
            }
            Guard::Table(table) => {
                table.lock().remove(&self.config);
            }
        }
        tracing::debug!(config = %self.config, "released run lock");
    }
}

impl fmt::Debug for StoreLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.guard {
            Guard::File(_) => "file",
            Guard::Table(_) => "memory",
        };
        f.debug_struct("StoreLock")
            .field("config", &self.config)
            .field("kind", &kind)
            .finish()
    }
}
