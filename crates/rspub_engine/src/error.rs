//! Error types for the engine.

use rspub_model::ConfigurationError;
use rspub_store::StoreError;
use std::fmt;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Stage of a run a deadline applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Walking, gating and fingerprinting.
    Scan,
    /// Handing documents to the writer.
    Write,
    /// The whole run.
    Run,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Scan => "scan",
            Stage::Write => "write",
            Stage::Run => "run",
        })
    }
}

/// The document writer failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot write {target}: {message}")]
pub struct DocumentWriteError {
    /// Document or index being written.
    pub target: String,
    /// What went wrong.
    pub message: String,
}

impl DocumentWriteError {
    /// Creates a new write error.
    pub fn new(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            message: message.into(),
        }
    }
}

/// Errors that end a run. Persisted state is left as it was.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The configuration is unusable.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The state store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A document could not be written.
    #[error("document write error: {0}")]
    DocumentWrite(#[from] DocumentWriteError),

    /// A deadline passed.
    #[error("{stage} timed out")]
    Timeout {
        /// The stage whose deadline passed.
        stage: Stage,
    },

    /// Another run of the same configuration holds the lock.
    #[error("a run of configuration '{config}' is already in progress")]
    RunInProgress {
        /// The configuration.
        config: String,
    },

    /// The run was cancelled.
    #[error("run cancelled")]
    Cancelled,
}

impl EngineError {
    /// Returns true if running again later may succeed without operator action.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Timeout { .. }
            | EngineError::RunInProgress { .. }
            | EngineError::DocumentWrite(_)
            | EngineError::Cancelled => true,
            EngineError::Store(e) => e.is_conflict() || e.is_locked(),
            EngineError::Configuration(_) => false,
        }
    }
}
