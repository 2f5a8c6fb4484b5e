//! Error types for store operations.

use rspub_model::{CodecError, DocumentId};
use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the state store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A blob failed to encode or decode.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A configuration document failed to parse.
    #[error("configuration document error: {0}")]
    Json(#[from] serde_json::Error),

    /// A blob is present but unreadable.
    #[error("store corrupted: {0}")]
    Corrupted(String),

    /// Another run holds the configuration lock.
    #[error("configuration '{config}' is locked by another run")]
    Locked {
        /// The locked configuration.
        config: String,
    },

    /// The stored state moved since the run loaded it.
    #[error("state conflict: expected latest document {expected:?}, found {found:?}")]
    Conflict {
        /// Latest document id the run started from.
        expected: Option<DocumentId>,
        /// Latest document id currently stored.
        found: Option<DocumentId>,
    },

    /// The configuration format version is newer than this build supports.
    #[error("unsupported configuration format version {found} (supported: {supported})")]
    UnsupportedFormat {
        /// Version found in the document.
        found: u32,
        /// Highest supported version.
        supported: u32,
    },
}

impl StoreError {
    /// Returns true if the error is a lock contention.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        matches!(self, StoreError::Locked { .. })
    }

    /// Returns true if the error is a compare-and-save conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let locked = StoreError::Locked {
            config: "c".into(),
        };
        assert!(locked.is_locked());
        assert!(!locked.is_conflict());

        let conflict = StoreError::Conflict {
            expected: None,
            found: Some(DocumentId::new(1, 1)),
        };
        assert!(conflict.is_conflict());
        assert!(conflict.to_string().contains("state conflict"));
    }

    #[test]
    fn io_conversion() {
        let err: StoreError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
