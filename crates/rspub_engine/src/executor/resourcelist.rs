//! New baseline.

use super::{assemble, chunk, issue_ids, Chain, ExecutionContext, Plan};
use rspub_model::{CapabilityIndex, DocumentEntry, DocumentKind, ResourceDescriptor, Snapshot};
use rspub_store::{PublishedState, StoreResult};
use tracing::info;

/// Lists every current resource in a new generation. The changelist chain
/// is dropped.
pub(super) fn plan(ctx: &ExecutionContext<'_>, current: &[ResourceDescriptor]) -> StoreResult<Plan> {
    let entries = current.iter().cloned().map(DocumentEntry::Resource).collect();
    let chunks = chunk(entries, ctx.config.max_entries_per_document);
    let ids = issue_ids(ctx, chunks.len(), true)?;
    let documents = assemble(
        ctx,
        Chain {
            kind: DocumentKind::Resourcelist,
            from: None,
            previous_uri: None,
            live: chunks.len(),
        },
        ids,
        chunks,
    );

    let mut snapshot = Snapshot::new();
    for document in &documents {
        for resource in document.resources() {
            snapshot.insert(resource.clone(), document.id);
        }
    }

    let mut capability_index = CapabilityIndex::new();
    capability_index.replace(
        DocumentKind::Resourcelist,
        documents.iter().map(|d| d.to_ref()).collect(),
    );

    let last = documents.last();
    let state = PublishedState {
        latest: last.map(|d| d.id),
        baseline: snapshot.clone(),
        snapshot,
        baseline_completed: last.map(|d| d.completed),
        capability_index,
    };

    info!(
        config = %ctx.config.id,
        documents = documents.len(),
        resources = current.len(),
        "planned resourcelist"
    );
    Ok(Plan { documents, state })
}
