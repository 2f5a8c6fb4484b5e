//! Run observers.

use crate::selector::{ExecutorKind, PriorState};
use parking_lot::Mutex;
use rspub_core::{GateEvaluationError, ScanWarning};
use rspub_model::{ChangeSummary, ConfigId, DocumentRef};
use std::path::PathBuf;

/// Something that happened during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// A run started.
    ExecutionStart {
        /// The configuration.
        config: ConfigId,
    },
    /// The gate rejected a resource.
    RejectedResource {
        /// Its path.
        path: PathBuf,
    },
    /// An entry was skipped while scanning.
    ScanWarning(ScanWarning),
    /// A gate predicate failed.
    GateFailure(GateEvaluationError),
    /// The diff is known and an executor chosen.
    FoundChanges {
        /// Counts per change kind.
        summary: ChangeSummary,
        /// State the run started from.
        prior: PriorState,
        /// Executor chosen; `None` if nothing is published.
        executor: Option<ExecutorKind>,
    },
    /// The writer accepted a document.
    CompletedDocument(DocumentRef),
    /// A run finished successfully.
    ExecutionEnd {
        /// The configuration.
        config: ConfigId,
        /// Documents written.
        documents: usize,
    },
}

/// Receives run events, on the thread executing the run.
pub trait RunObserver: Send + Sync {
    /// Called for every event.
    fn on_event(&self, event: &RunEvent);
}

/// An observer keeping every event.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<RunEvent>>,
}

impl RecordingObserver {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events so far.
    #[must_use]
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().clone()
    }

    /// Forgets recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl RunObserver for RecordingObserver {
    fn on_event(&self, event: &RunEvent) {
        self.events.lock().push(event.clone());
    }
}
