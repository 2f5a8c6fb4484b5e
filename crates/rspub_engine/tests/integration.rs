//! End-to-end runs over in-memory and on-disk publishers.

use proptest::prelude::*;
use rspub_core::gate::predicate::from_fn;
use rspub_core::{GateBuilder, SharedPredicate};
use rspub_engine::{
    EngineError, ExecutorKind, PriorState, RecordingObserver, RunEvent, RunOptions,
};
use rspub_model::{ChangeKind, ConfigurationError, DocumentId, DocumentKind, Selector, Strategy};
use rspub_store::{StoreBackend, StoreError, SEQUENCE_BLOB, STATE_BLOB};
use rspub_testkit::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

fn inc_publisher(id: &str) -> TestPublisher {
    init_tracing();
    TestPublisher::memory(id).configure(|c| c.with_strategy(Strategy::IncChangelist))
}

#[test]
fn baseline_then_incremental_changes() {
    let p = inc_publisher("scenario");
    p.write("a.txt", b"alpha");
    p.write("b.txt", b"beta");
    p.write("c.txt", b"gamma");

    let first = p.run().unwrap();
    assert_eq!(first.executor, Some(ExecutorKind::Resourcelist));
    assert_eq!(first.documents.len(), 1);
    let g = first.documents[0].id.generation;
    assert_eq!(first.documents[0].id, DocumentId::new(g, 1));
    assert_eq!(first.documents[0].entries, 3);

    p.delete("a.txt");
    p.write("b.txt", b"beta, revised");
    let second = p.run().unwrap();
    assert_eq!(second.executor, Some(ExecutorKind::IncChangelist));
    assert_eq!(second.documents[0].id, DocumentId::new(g, 2));
    assert_eq!(second.summary.deleted, 1);
    assert_eq!(second.summary.updated, 1);
    assert_eq!(second.summary.unchanged, 1);

    let changelist = p.writer.documents().pop().unwrap();
    let changes: Vec<_> = changelist
        .changes()
        .map(|c| (c.identity.clone(), c.kind))
        .collect();
    assert_eq!(
        changes,
        vec![
            (p.uri("a.txt"), ChangeKind::Deleted),
            (p.uri("b.txt"), ChangeKind::Updated),
        ]
    );
    assert_eq!(p.state().unwrap().snapshot.len(), 2);

    let third = p.run().unwrap();
    assert_eq!(third.prior, PriorState::HasHistoryNoChanges);
    assert!(third.documents.is_empty());
    assert_eq!(p.last_sequence(), Some(DocumentId::new(g, 2)));

    p.write("d.txt", b"delta");
    let fourth = p
        .run_with(RunOptions::new().with_strategy(Strategy::NewChangelist))
        .unwrap();
    assert_eq!(fourth.executor, Some(ExecutorKind::NewChangelist));
    assert_eq!(fourth.documents[0].id, DocumentId::new(g + 1, 1));
    let index = p.engine.capability_index(&p.config.id).unwrap();
    assert_eq!(index.documents(DocumentKind::Changelist).len(), 1);
    assert_eq!(index.documents(DocumentKind::Resourcelist).len(), 1);
    // Every change since the baseline: a deleted, b updated, d created.
    assert_eq!(fourth.documents[0].entries, 3);
}

#[test]
fn repeated_runs_leave_state_untouched() {
    let p = inc_publisher("idempotent");
    p.write("a.txt", b"a");
    p.write("dir/b.txt", b"b");
    p.run().unwrap();
    let state = p.state_bytes();
    let sequence = p.store().backend().read(&p.config.id, SEQUENCE_BLOB).unwrap();

    for _ in 0..3 {
        let report = p.run().unwrap();
        assert!(!report.published());
    }

    assert_eq!(p.state_bytes(), state);
    assert_eq!(
        p.store().backend().read(&p.config.id, SEQUENCE_BLOB).unwrap(),
        sequence
    );
    assert_eq!(p.writer.documents().len(), 1);
}

#[test]
fn commit_failure_keeps_previous_state() {
    let p = inc_publisher("crash");
    p.write("a.txt", b"a");
    p.run().unwrap();
    let before = p.state_bytes();

    p.write("b.txt", b"b");
    p.faults().fail_replaces(STATE_BLOB, 1);
    let err = p.run().unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::Io(_))));
    assert_eq!(p.state_bytes(), before);
    let burned = p.last_sequence().unwrap();

    let report = p.run().unwrap();
    assert!(report.documents[0].id > burned);
    assert_eq!(report.summary.created, 1);
    assert!(p.replay().same_resources(&p.state().unwrap().snapshot));
}

#[test]
fn failed_write_burns_ids() {
    let p = inc_publisher("write-failure");
    p.write("a.txt", b"a");
    p.run().unwrap();

    p.write("b.txt", b"b");
    p.writer.fail_on(1);
    assert!(matches!(p.run(), Err(EngineError::DocumentWrite(_))));
    let burned = p.last_sequence().unwrap();
    assert_eq!(p.state().unwrap().latest, Some(DocumentId::new(burned.generation, 1)));

    p.writer.heal();
    let report = p.run().unwrap();
    assert_eq!(report.documents[0].id, burned.next());
}

#[test]
fn large_sets_split_with_index_links() {
    let p = inc_publisher("split").configure(|c| c.with_max_entries(2));
    for name in ["a", "b", "c", "d", "e"] {
        p.write(&format!("{name}.txt"), name.as_bytes());
    }

    let report = p.run().unwrap();
    assert_eq!(report.documents.len(), 3);
    let entries: Vec<_> = report.documents.iter().map(|d| d.entries).collect();
    assert_eq!(entries, vec![2, 2, 1]);

    let docs = p.writer.documents();
    let index_uri = format!("{URL_PREFIX}/metadata/resourcelist-index.xml");
    for (i, doc) in docs.iter().enumerate() {
        assert_eq!(doc.id.sequence, i as u64 + 1);
        assert_eq!(doc.links.index.as_deref(), Some(index_uri.as_str()));
        assert_eq!(doc.file_name, format!("resourcelist_0001_000{}.xml", i + 1));
    }
    assert_eq!(docs[1].links.previous.as_deref(), Some(docs[0].uri.as_str()));
    assert_eq!(docs[1].links.next.as_deref(), Some(docs[2].uri.as_str()));

    let index = p.writer.last_index().unwrap();
    assert_eq!(index.documents(DocumentKind::Resourcelist).len(), 3);
    assert_eq!(
        index.latest(DocumentKind::Resourcelist).map(|r| r.id),
        Some(docs[2].id)
    );
}

struct RejectLarge;

impl GateBuilder for RejectLarge {
    fn name(&self) -> &str {
        "reject-large"
    }

    fn build_reject(
        &self,
        mut reject: Vec<SharedPredicate>,
    ) -> Result<Vec<SharedPredicate>, ConfigurationError> {
        reject.push(from_fn("large", |r| Ok(r.size > 8)));
        Ok(reject)
    }
}

#[test]
fn gate_selects_published_resources() {
    let mut selector = Selector::new();
    selector.include(["**/*.txt"]).exclude(["private/**"]);
    let p = inc_publisher("gate").configure(|c| {
        let mut c = c.with_selector(selector);
        c.gate.builders.push("reject-large".into());
        c
    });
    p.engine
        .register_gate_builder("reject-large", Arc::new(RejectLarge));

    p.write("a.txt", b"a");
    p.write("docs/b.txt", b"b");
    p.write("c.md", b"c");
    p.write(".hidden.txt", b"h");
    p.write("private/d.txt", b"d");
    p.write("big.txt", b"0123456789");
    p.write("metadata/changelist_0001_0001.xml", b"<urlset/>");

    let report = p.run().unwrap();

    let published = relative_paths(&p.state().unwrap().snapshot, &p.root());
    assert_eq!(published, vec!["a.txt", "docs/b.txt"]);
    assert_eq!(report.rejected, 5);
    assert_eq!(report.resources, 2);
}

#[test]
fn failing_predicate_rejects_and_warns() {
    let p = inc_publisher("gate-error").configure(|mut c| {
        c.gate.builders.push("flaky".into());
        c
    });
    struct Flaky;
    impl GateBuilder for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        fn build_reject(
            &self,
            mut reject: Vec<SharedPredicate>,
        ) -> Result<Vec<SharedPredicate>, ConfigurationError> {
            reject.push(from_fn("flaky", |r| {
                if r.identity.ends_with("bad.txt") {
                    Err("cannot decide".to_string())
                } else {
                    Ok(false)
                }
            }));
            Ok(reject)
        }
    }
    p.engine.register_gate_builder("flaky", Arc::new(Flaky));
    let observer = Arc::new(RecordingObserver::new());
    p.engine.add_observer(observer.clone());
    p.write("good.txt", b"g");
    p.write("bad.txt", b"b");

    let report = p.run().unwrap();

    assert_eq!(report.resources, 1);
    assert_eq!(report.warnings.len(), 1);
    assert!(observer
        .events()
        .iter()
        .any(|e| matches!(e, RunEvent::GateFailure(err) if err.predicate == "flaky")));
}

#[test]
fn unreadable_entries_are_skipped() {
    let p = inc_publisher("unreadable");
    p.write("a.txt", b"a");
    p.write("locked/b.txt", b"b");
    p.memory_source().unwrap().fail(p.path("locked"));

    let report = p.run().unwrap();

    assert_eq!(report.resources, 1);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].to_string().contains("locked"));
}

#[test]
fn state_survives_restart_on_disk() {
    init_tracing();
    let p = TestPublisher::on_disk("disk")
        .configure(|c| c.with_strategy(Strategy::IncChangelist));
    p.write("a.txt", b"alpha");
    p.write("nested/b.txt", b"beta");
    let first = p.run().unwrap();
    assert_eq!(first.documents[0].id, DocumentId::new(1, 1));

    let p = p.restart();
    assert!(!p.run().unwrap().published());

    p.write("a.txt", b"alpha, longer");
    let report = p.run().unwrap();
    assert_eq!(report.executor, Some(ExecutorKind::IncChangelist));
    assert_eq!(report.documents[0].id, DocumentId::new(1, 2));
    assert_eq!(report.summary.updated, 1);
    assert_eq!(
        relative_paths(&p.state().unwrap().snapshot, &p.root()),
        vec!["a.txt", "nested/b.txt"]
    );
}

fn check_history(strategy: Strategy, tree: BTreeMap<String, Vec<u8>>, steps: Vec<Vec<Mutation>>) {
    let p = TestPublisher::memory("history")
        .configure(|c| c.with_strategy(strategy).with_max_entries(3));
    let mut model = BTreeMap::new();
    for (name, content) in &tree {
        apply_mutation(&p, &mut model, &Mutation::Write(name.clone(), content.clone()));
    }

    let mut last_id = None;
    for step in std::iter::once(Vec::new()).chain(steps) {
        for mutation in &step {
            apply_mutation(&p, &mut model, mutation);
        }
        let report = p.run().unwrap();
        for doc in &report.documents {
            assert!(Some(doc.id) > last_id, "{:?} after {:?}", doc.id, last_id);
            last_id = Some(doc.id);
        }

        let state = p.state().unwrap();
        assert!(p.replay().same_resources(&state.snapshot));
        let published = relative_paths(&state.snapshot, &p.root());
        let expected: Vec<_> = model.keys().cloned().collect();
        assert_eq!(published, expected);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn incremental_history_reconstructs_snapshot(
        tree in tree_strategy(8),
        steps in prop::collection::vec(prop::collection::vec(mutation_strategy(), 0..5), 1..5),
    ) {
        check_history(Strategy::IncChangelist, tree, steps);
    }

    #[test]
    fn new_changelist_history_reconstructs_snapshot(
        tree in tree_strategy(8),
        steps in prop::collection::vec(prop::collection::vec(mutation_strategy(), 0..5), 1..5),
    ) {
        check_history(Strategy::NewChangelist, tree, steps);
    }
}
