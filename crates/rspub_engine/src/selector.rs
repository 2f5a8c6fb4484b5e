//! Strategy selection.
//!
//! ```text
//!   NoHistory ───────────────────────────────► Resourcelist
//!   HasHistoryNoChanges ─────────────────────► (nothing)
//!   HasHistoryWithChanges ─┬─ resourcelist ──► Resourcelist
//!                          ├─ new_changelist ► NewChangelist
//!                          └─ inc_changelist ► IncChangelist
//! ```

use rspub_model::Strategy;
use std::fmt;

/// What the store knew before the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorState {
    /// Nothing published yet, or a new baseline was requested.
    NoHistory,
    /// Published, and the current resources match the snapshot.
    HasHistoryNoChanges,
    /// Published, and the current resources differ from the snapshot.
    HasHistoryWithChanges,
}

impl PriorState {
    /// Classifies a run.
    #[must_use]
    pub fn classify(has_history: bool, has_changes: bool, start_new: bool) -> Self {
        match (has_history && !start_new, has_changes) {
            (false, _) => PriorState::NoHistory,
            (true, false) => PriorState::HasHistoryNoChanges,
            (true, true) => PriorState::HasHistoryWithChanges,
        }
    }
}

impl fmt::Display for PriorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PriorState::NoHistory => "no_history",
            PriorState::HasHistoryNoChanges => "has_history_no_changes",
            PriorState::HasHistoryWithChanges => "has_history_with_changes",
        })
    }
}

/// The executors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorKind {
    /// Publishes a new baseline.
    Resourcelist,
    /// Starts a new changelist chain against the baseline.
    NewChangelist,
    /// Appends to the changelist chain.
    IncChangelist,
}

impl ExecutorKind {
    /// Picks the executor for a prior state. `None` means publish nothing.
    #[must_use]
    pub fn select(prior: PriorState, strategy: Strategy) -> Option<Self> {
        match prior {
            PriorState::NoHistory => Some(ExecutorKind::Resourcelist),
            PriorState::HasHistoryNoChanges => None,
            PriorState::HasHistoryWithChanges => Some(match strategy {
                Strategy::Resourcelist => ExecutorKind::Resourcelist,
                Strategy::NewChangelist => ExecutorKind::NewChangelist,
                Strategy::IncChangelist => ExecutorKind::IncChangelist,
            }),
        }
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutorKind::Resourcelist => "resourcelist",
            ExecutorKind::NewChangelist => "new_changelist",
            ExecutorKind::IncChangelist => "inc_changelist",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(PriorState::classify(false, true, false), PriorState::NoHistory);
        assert_eq!(PriorState::classify(false, false, false), PriorState::NoHistory);
        assert_eq!(PriorState::classify(true, true, true), PriorState::NoHistory);
        assert_eq!(
            PriorState::classify(true, false, false),
            PriorState::HasHistoryNoChanges
        );
        assert_eq!(
            PriorState::classify(true, true, false),
            PriorState::HasHistoryWithChanges
        );
    }

    #[test]
    fn selection_table() {
        for strategy in Strategy::ALL {
            assert_eq!(
                ExecutorKind::select(PriorState::NoHistory, strategy),
                Some(ExecutorKind::Resourcelist)
            );
            assert_eq!(
                ExecutorKind::select(PriorState::HasHistoryNoChanges, strategy),
                None
            );
        }
        assert_eq!(
            ExecutorKind::select(PriorState::HasHistoryWithChanges, Strategy::Resourcelist),
            Some(ExecutorKind::Resourcelist)
        );
        assert_eq!(
            ExecutorKind::select(PriorState::HasHistoryWithChanges, Strategy::NewChangelist),
            Some(ExecutorKind::NewChangelist)
        );
        assert_eq!(
            ExecutorKind::select(PriorState::HasHistoryWithChanges, Strategy::IncChangelist),
            Some(ExecutorKind::IncChangelist)
        );
    }
}
