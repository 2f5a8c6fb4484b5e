//! Executors turn a diff into documents and the state to publish.
//!
//! Executors only plan: they issue document ids and build descriptors. The
//! engine writes the documents and commits the state, so a failed write
//! leaves the store as it was apart from the burned ids.

mod changelist;
mod resourcelist;

use crate::selector::ExecutorKind;
use rspub_core::Diff;
use rspub_model::{
    Configuration, DocumentDescriptor, DocumentEntry, DocumentId, DocumentKind, DocumentLinks,
    DocumentRef, ResourceDescriptor,
};
use rspub_store::{PublishedState, StateStore, StoreResult};
use std::time::SystemTime;

/// What a run is about to publish.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Documents in writing order.
    pub documents: Vec<DocumentDescriptor>,
    /// State to commit once every document is written.
    pub state: PublishedState,
}

impl Plan {
    /// References to the planned documents.
    #[must_use]
    pub fn refs(&self) -> Vec<DocumentRef> {
        self.documents.iter().map(DocumentDescriptor::to_ref).collect()
    }
}

pub(crate) struct ExecutionContext<'a> {
    pub config: &'a Configuration,
    pub store: &'a StateStore,
    pub started: SystemTime,
}

impl ExecutorKind {
    pub(crate) fn plan(
        self,
        ctx: &ExecutionContext<'_>,
        previous: Option<&PublishedState>,
        current: &[ResourceDescriptor],
        diff: &Diff,
    ) -> StoreResult<Plan> {
        let empty = PublishedState::default();
        let previous = previous.unwrap_or(&empty);
        match self {
            ExecutorKind::Resourcelist => resourcelist::plan(ctx, current),
            ExecutorKind::NewChangelist => changelist::plan_new(ctx, previous, current),
            ExecutorKind::IncChangelist => changelist::plan_incremental(ctx, previous, diff),
        }
    }
}

/// Splits entries into documents of at most `max` entries. Always returns at
/// least one, possibly empty, chunk.
fn chunk(entries: Vec<DocumentEntry>, max: usize) -> Vec<Vec<DocumentEntry>> {
    if entries.is_empty() {
        return vec![Vec::new()];
    }
    let max = max.max(1);
    let mut chunks = Vec::with_capacity(entries.len().div_ceil(max));
    let mut iter = entries.into_iter().peekable();
    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(max).collect());
    }
    chunks
}

/// Issues `count` ids, opening a new generation first if `restart`.
fn issue_ids(
    ctx: &ExecutionContext<'_>,
    count: usize,
    restart: bool,
) -> StoreResult<Vec<DocumentId>> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let id = if i == 0 && restart {
            ctx.store.restart_sequence(&ctx.config.id)?
        } else {
            ctx.store.next_sequence(&ctx.config.id)?
        };
        ids.push(id);
    }
    Ok(ids)
}

/// Where new documents sit in their chain.
struct Chain {
    kind: DocumentKind,
    from: Option<SystemTime>,
    previous_uri: Option<String>,
    /// Live documents of the kind once these are published.
    live: usize,
}

fn assemble(
    ctx: &ExecutionContext<'_>,
    chain: Chain,
    ids: Vec<DocumentId>,
    chunks: Vec<Vec<DocumentEntry>>,
) -> Vec<DocumentDescriptor> {
    let config = ctx.config;
    let index = (chain.live > 1).then(|| config.output_uri(&chain.kind.index_file_name()));
    let up = Some(config.capabilitylist_uri());

    let mut documents: Vec<DocumentDescriptor> = ids
        .into_iter()
        .zip(chunks)
        .map(|(id, entries)| {
            let file_name = config.document_file_name(chain.kind, id.generation, id.sequence);
            DocumentDescriptor {
                kind: chain.kind,
                id,
                uri: config.output_uri(&file_name),
                file_name,
                entries,
                links: DocumentLinks {
                    previous: None,
                    next: None,
                    index: index.clone(),
                    up: up.clone(),
                },
                at: ctx.started,
                completed: SystemTime::now(),
                from: chain.from,
            }
        })
        .collect();

    let uris: Vec<String> = documents.iter().map(|d| d.uri.clone()).collect();
    for (i, document) in documents.iter_mut().enumerate() {
        document.links.previous = if i == 0 {
            chain.previous_uri.clone()
        } else {
            Some(uris[i - 1].clone())
        };
        document.links.next = uris.get(i + 1).cloned();
    }
    documents
}
