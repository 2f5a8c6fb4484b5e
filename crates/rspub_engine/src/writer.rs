//! The document writer seam.

use crate::error::DocumentWriteError;
use parking_lot::Mutex;
use rspub_model::{CapabilityIndex, Configuration, DocumentDescriptor};
use std::time::Duration;

/// Serializes and publishes documents.
///
/// The engine hands over every document of a run in order, then the updated
/// capability index. The physical format is the writer's business.
pub trait DocumentWriter: Send + Sync {
    /// Writes one document.
    fn write_document(
        &self,
        config: &Configuration,
        document: &DocumentDescriptor,
    ) -> Result<(), DocumentWriteError>;

    /// Writes the capability index after all documents of a run.
    fn write_capability_index(
        &self,
        config: &Configuration,
        index: &CapabilityIndex,
    ) -> Result<(), DocumentWriteError>;
}

/// A writer keeping everything in memory.
///
/// Can be told to fail on the n-th document or to stall before each one.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    documents: Mutex<Vec<DocumentDescriptor>>,
    indexes: Mutex<Vec<CapabilityIndex>>,
    fail_on: Mutex<Option<usize>>,
    delay: Mutex<Option<Duration>>,
}

impl MemoryWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the document with this 0-based position among all documents
    /// written so far.
    pub fn fail_on(&self, position: usize) {
        *self.fail_on.lock() = Some(position);
    }

    /// Stops failing.
    pub fn heal(&self) {
        *self.fail_on.lock() = None;
    }

    /// Sleeps this long before each document.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Documents written so far.
    #[must_use]
    pub fn documents(&self) -> Vec<DocumentDescriptor> {
        self.documents.lock().clone()
    }

    /// Latest capability index written.
    #[must_use]
    pub fn last_index(&self) -> Option<CapabilityIndex> {
        self.indexes.lock().last().cloned()
    }

    /// Number of capability indexes written.
    #[must_use]
    pub fn index_writes(&self) -> usize {
        self.indexes.lock().len()
    }

    /// Forgets everything written.
    pub fn clear(&self) {
        self.documents.lock().clear();
        self.indexes.lock().clear();
    }
}

impl DocumentWriter for MemoryWriter {
    fn write_document(
        &self,
        _config: &Configuration,
        document: &DocumentDescriptor,
    ) -> Result<(), DocumentWriteError> {
        if let Some(delay) = *self.delay.lock() {
            std::thread::sleep(delay);
        }
        let mut documents = self.documents.lock();
        if *self.fail_on.lock() == Some(documents.len()) {
            return Err(DocumentWriteError::new(
                &document.file_name,
                "injected write failure",
            ));
        }
        documents.push(document.clone());
        Ok(())
    }

    fn write_capability_index(
        &self,
        _config: &Configuration,
        index: &CapabilityIndex,
    ) -> Result<(), DocumentWriteError> {
        self.indexes.lock().push(index.clone());
        Ok(())
    }
}
