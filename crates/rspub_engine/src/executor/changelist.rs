//! Changelists.

use super::{assemble, chunk, issue_ids, Chain, ExecutionContext, Plan};
use rspub_core::{diff, Diff};
use rspub_model::{
    ChangeRecord, DocumentDescriptor, DocumentEntry, DocumentKind, ResourceDescriptor, Snapshot,
};
use rspub_store::{PublishedState, StoreResult};
use tracing::info;

fn entries(records: &[ChangeRecord]) -> Vec<DocumentEntry> {
    records.iter().cloned().map(DocumentEntry::Change).collect()
}

fn apply(mut snapshot: Snapshot, documents: &[DocumentDescriptor]) -> Snapshot {
    for document in documents {
        for change in document.changes() {
            snapshot.apply(change, document.id);
        }
    }
    snapshot
}

/// Starts a new chain in a new generation.
///
/// The first document holds every change since the baseline, so the
/// baseline plus the new chain describes the current resources. It is
/// written even when the current resources match the baseline again.
pub(super) fn plan_new(
    ctx: &ExecutionContext<'_>,
    previous: &PublishedState,
    current: &[ResourceDescriptor],
) -> StoreResult<Plan> {
    let since_baseline = diff(&previous.baseline, current);
    let chunks = chunk(
        entries(&since_baseline.records),
        ctx.config.max_entries_per_document,
    );
    let ids = issue_ids(ctx, chunks.len(), true)?;
    let documents = assemble(
        ctx,
        Chain {
            kind: DocumentKind::Changelist,
            from: previous.baseline_completed,
            previous_uri: None,
            live: chunks.len(),
        },
        ids,
        chunks,
    );

    let mut capability_index = previous.capability_index.clone();
    capability_index.replace(
        DocumentKind::Changelist,
        documents.iter().map(|d| d.to_ref()).collect(),
    );
    let state = PublishedState {
        latest: documents.last().map(|d| d.id),
        snapshot: apply(previous.baseline.clone(), &documents),
        baseline: previous.baseline.clone(),
        baseline_completed: previous.baseline_completed,
        capability_index,
    };

    info!(
        config = %ctx.config.id,
        documents = documents.len(),
        changes = since_baseline.records.len(),
        "planned new changelist"
    );
    Ok(Plan { documents, state })
}

/// Appends the changes since the last run to the chain.
pub(super) fn plan_incremental(
    ctx: &ExecutionContext<'_>,
    previous: &PublishedState,
    changes: &Diff,
) -> StoreResult<Plan> {
    let chunks = chunk(entries(&changes.records), ctx.config.max_entries_per_document);
    let existing = previous.capability_index.documents(DocumentKind::Changelist);
    let ids = issue_ids(ctx, chunks.len(), false)?;
    let documents = assemble(
        ctx,
        Chain {
            kind: DocumentKind::Changelist,
            from: previous.baseline_completed,
            previous_uri: existing.last().map(|d| d.uri.clone()),
            live: existing.len() + chunks.len(),
        },
        ids,
        chunks,
    );

    let mut capability_index = previous.capability_index.clone();
    capability_index.append(
        DocumentKind::Changelist,
        documents.iter().map(|d| d.to_ref()),
    );
    let state = PublishedState {
        latest: documents.last().map(|d| d.id),
        snapshot: apply(previous.snapshot.clone(), &documents),
        baseline: previous.baseline.clone(),
        baseline_completed: previous.baseline_completed,
        capability_index,
    };

    info!(
        config = %ctx.config.id,
        documents = documents.len(),
        changes = changes.records.len(),
        "planned incremental changelist"
    );
    Ok(Plan { documents, state })
}
