//! Run reports.

use crate::selector::{ExecutorKind, PriorState};
use rspub_core::{GateEvaluationError, ScanWarning};
use rspub_model::{ChangeSummary, ConfigId, DocumentRef, Strategy};
use std::fmt;
use std::time::Duration;

/// A per-resource problem that did not stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunWarning {
    /// An entry was skipped while scanning.
    Scan(ScanWarning),
    /// A gate predicate failed; the resource was rejected.
    Gate(GateEvaluationError),
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunWarning::Scan(w) => w.fmt(f),
            RunWarning::Gate(e) => e.fmt(f),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The configuration.
    pub config: ConfigId,
    /// Strategy in effect.
    pub strategy: Strategy,
    /// What the store knew before the run.
    pub prior: PriorState,
    /// Executor that ran; `None` if nothing was published.
    pub executor: Option<ExecutorKind>,
    /// Documents written, in order.
    pub documents: Vec<DocumentRef>,
    /// Change counts against the previous snapshot.
    pub summary: ChangeSummary,
    /// Eligible resources found.
    pub resources: usize,
    /// Resources the gate rejected.
    pub rejected: usize,
    /// Problems that did not stop the run.
    pub warnings: Vec<RunWarning>,
    /// Wall time of the run.
    pub duration: Duration,
}

impl RunReport {
    /// Returns true if documents were published.
    #[must_use]
    pub fn published(&self) -> bool {
        !self.documents.is_empty()
    }
}
