//! Per-resource problems and scan aborts.

use std::path::PathBuf;
use thiserror::Error;

/// A non-fatal problem found while scanning. The entry is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanWarning {
    /// A root location does not exist.
    #[error("root location does not exist: {}", path.display())]
    MissingRoot {
        /// The root.
        path: PathBuf,
    },

    /// Metadata, listing or content could not be read.
    #[error("cannot read {}: {message}", path.display())]
    Io {
        /// The entry.
        path: PathBuf,
        /// The I/O error message.
        message: String,
    },

    /// A directory leads back to one of its ancestors.
    #[error("symbolic link cycle at {}", path.display())]
    Cycle {
        /// The directory that closes the cycle.
        path: PathBuf,
    },
}

impl ScanWarning {
    pub(crate) fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        ScanWarning::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// The entry the warning is about.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            ScanWarning::MissingRoot { path }
            | ScanWarning::Io { path, .. }
            | ScanWarning::Cycle { path } => path,
        }
    }
}

/// A gate predicate failed to evaluate. The resource is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("predicate '{predicate}' failed on {}: {message}", path.display())]
pub struct GateEvaluationError {
    /// Name of the failing predicate.
    pub predicate: String,
    /// The resource being evaluated.
    pub path: PathBuf,
    /// What went wrong.
    pub message: String,
}

impl GateEvaluationError {
    /// Creates a new evaluation error.
    pub fn new(
        predicate: impl Into<String>,
        path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            predicate: predicate.into(),
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Reasons a scan stops before completing.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanAbort {
    /// The scan deadline passed.
    #[error("scan deadline exceeded")]
    TimedOut,

    /// The run was cancelled.
    #[error("scan cancelled")]
    Cancelled,
}
