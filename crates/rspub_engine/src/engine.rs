//! Run orchestration.

use crate::config::{EngineOptions, RunOptions};
use crate::error::{EngineError, EngineResult, Stage};
use crate::executor::ExecutionContext;
use crate::observer::{RunEvent, RunObserver};
use crate::report::{RunReport, RunWarning};
use crate::selector::{ExecutorKind, PriorState};
use crate::writer::DocumentWriter;
use parking_lot::RwLock;
use rspub_core::{
    collect_resources, diff, FingerprintPool, GateBuilder, ResourceGate, ResourceGateBuilder,
    ResourceSource, ScanAbort, ScanControl,
};
use rspub_model::{CapabilityIndex, ConfigId, Configuration, ConfigurationError, Snapshot};
use rspub_store::{StateCommit, StateStore};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};

/// What the engine is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No run has started.
    Idle,
    /// Walking, gating and fingerprinting.
    Scanning,
    /// Issuing ids and building documents.
    Executing,
    /// Handing documents to the writer.
    Writing,
    /// Saving the published state.
    Committing,
    /// The last run succeeded.
    Completed,
    /// The last run failed.
    Error,
}

impl EngineState {
    /// Returns true while a run is in flight.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            EngineState::Scanning
                | EngineState::Executing
                | EngineState::Writing
                | EngineState::Committing
        )
    }
}

/// Statistics across runs.
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    /// Runs that finished successfully, including those publishing nothing.
    pub runs_completed: u64,
    /// Runs that ended with an error.
    pub runs_failed: u64,
    /// Documents written by successful runs.
    pub documents_written: u64,
    /// Duration of the last successful run.
    pub last_run_duration: Option<Duration>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Cancels runs from another thread.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Requests cancellation of the current run.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The synchronization strategy engine.
///
/// A run scans a configuration's resources, diffs them against the last
/// published snapshot, picks an executor, hands the documents to the writer
/// and commits the new state. Runs of one configuration are serialized by
/// the store lock; a concurrent second run fails with
/// [`EngineError::RunInProgress`].
pub struct SyncEngine {
    store: StateStore,
    source: Arc<dyn ResourceSource>,
    writer: Arc<dyn DocumentWriter>,
    options: EngineOptions,
    pool: FingerprintPool,
    builders: RwLock<BTreeMap<String, Arc<dyn GateBuilder>>>,
    observers: RwLock<Vec<Arc<dyn RunObserver>>>,
    state: RwLock<EngineState>,
    stats: RwLock<EngineStats>,
    cancelled: Arc<AtomicBool>,
}

impl SyncEngine {
    /// Creates an engine.
    pub fn new(
        store: StateStore,
        source: Arc<dyn ResourceSource>,
        writer: Arc<dyn DocumentWriter>,
        options: EngineOptions,
    ) -> Self {
        Self {
            store,
            source,
            writer,
            pool: FingerprintPool::new(options.concurrency),
            options,
            builders: RwLock::new(BTreeMap::new()),
            observers: RwLock::new(Vec::new()),
            state: RwLock::new(EngineState::Idle),
            stats: RwLock::new(EngineStats::default()),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Registers a gate builder configurations can name.
    pub fn register_gate_builder(&self, name: impl Into<String>, builder: Arc<dyn GateBuilder>) {
        self.builders.write().insert(name.into(), builder);
    }

    /// Adds an observer.
    pub fn add_observer(&self, observer: Arc<dyn RunObserver>) {
        self.observers.write().push(observer);
    }

    /// Returns the current state.
    pub fn state(&self) -> EngineState {
        *self.state.read()
    }

    /// Returns run statistics.
    pub fn stats(&self) -> EngineStats {
        self.stats.read().clone()
    }

    /// Returns the engine options.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Returns the state store.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Cancels the current run.
    ///
    /// Runs reset the flag when they start, so this only affects a run
    /// already in flight.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns a handle that cancels runs of this engine.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancelled))
    }

    fn reset_cancel(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    fn set_state(&self, state: EngineState) {
        *self.state.write() = state;
    }

    fn notify(&self, event: &RunEvent) {
        let observers = self.observers.read().clone();
        for observer in observers {
            observer.on_event(event);
        }
    }

    /// The capability index last published for a configuration.
    pub fn capability_index(&self, config: &ConfigId) -> EngineResult<CapabilityIndex> {
        Ok(self.store.load_capability_index(config)?)
    }

    /// Builds the gate a run of `config` would use.
    pub fn gate(&self, config: &Configuration) -> EngineResult<ResourceGate> {
        let builders = self.builders.read();
        let chain = ResourceGateBuilder::for_configuration(config, |name| builders.get(name).cloned())?;
        Ok(chain.build()?)
    }

    /// Runs `config` with its own strategy.
    pub fn run(&self, config: &Configuration) -> EngineResult<RunReport> {
        self.run_with(config, RunOptions::default())
    }

    /// Runs `config` with per-run options.
    ///
    /// # Errors
    ///
    /// On error nothing is committed: the snapshot, baseline and capability
    /// index stay as they were. Document ids issued before the failure are
    /// not reused.
    pub fn run_with(&self, config: &Configuration, options: RunOptions) -> EngineResult<RunReport> {
        let start = Instant::now();
        self.reset_cancel();

        let result = self.execute(config, options, start);
        match &result {
            Ok(report) => {
                self.set_state(EngineState::Completed);
                let mut stats = self.stats.write();
                stats.runs_completed += 1;
                stats.documents_written += report.documents.len() as u64;
                stats.last_run_duration = Some(report.duration);
                stats.last_error = None;
            }
            Err(e) => {
                warn!(config = %config.id, error = %e, "run failed");
                self.set_state(EngineState::Error);
                let mut stats = self.stats.write();
                stats.runs_failed += 1;
                stats.last_error = Some(e.to_string());
            }
        }
        result
    }

    fn execute(
        &self,
        config: &Configuration,
        options: RunOptions,
        start: Instant,
    ) -> EngineResult<RunReport> {
        config.validate()?;
        if let Some(root) = config.roots.iter().find(|root| !self.source.exists(root)) {
            return Err(ConfigurationError::MissingRoot(root.clone()).into());
        }
        let gate = self.gate(config)?;

        let _lock = self.store.lock(&config.id).map_err(|e| {
            if e.is_locked() {
                EngineError::RunInProgress {
                    config: config.id.to_string(),
                }
            } else {
                e.into()
            }
        })?;

        let limits = self.options.limits;
        let run_deadline = limits.run.map(|d| start + d);
        let started = SystemTime::now();
        let strategy = options.strategy.unwrap_or(config.strategy);
        info!(config = %config.id, %strategy, start_new = options.start_new, "run started");
        self.notify(&RunEvent::ExecutionStart {
            config: config.id.clone(),
        });

        self.set_state(EngineState::Scanning);
        let previous = self.store.load_state(&config.id)?;
        let control = ScanControl {
            pool: self.pool.clone(),
            deadline: earliest(run_deadline, limits.scan.map(|d| Instant::now() + d)),
            cancelled: Some(&*self.cancelled),
        };
        let outcome =
            collect_resources(config, self.source.as_ref(), &gate, &control).map_err(|abort| {
                match abort {
                    ScanAbort::Cancelled => EngineError::Cancelled,
                    ScanAbort::TimedOut => EngineError::Timeout {
                        stage: stage_for(run_deadline, Stage::Scan),
                    },
                }
            })?;

        let mut warnings = Vec::with_capacity(outcome.warnings.len() + outcome.gate_errors.len());
        for path in &outcome.rejected {
            self.notify(&RunEvent::RejectedResource { path: path.clone() });
        }
        for warning in &outcome.warnings {
            self.notify(&RunEvent::ScanWarning(warning.clone()));
            warnings.push(RunWarning::Scan(warning.clone()));
        }
        for error in &outcome.gate_errors {
            self.notify(&RunEvent::GateFailure(error.clone()));
            warnings.push(RunWarning::Gate(error.clone()));
        }

        let empty = Snapshot::new();
        let changes = diff(
            previous.as_ref().map_or(&empty, |state| &state.snapshot),
            &outcome.resources,
        );
        let prior = PriorState::classify(previous.is_some(), !changes.is_empty(), options.start_new);
        let executor = ExecutorKind::select(prior, strategy);
        info!(
            config = %config.id,
            %prior,
            executor = ?executor,
            created = changes.summary.created,
            updated = changes.summary.updated,
            deleted = changes.summary.deleted,
            unchanged = changes.summary.unchanged,
            "found changes"
        );
        self.notify(&RunEvent::FoundChanges {
            summary: changes.summary,
            prior,
            executor,
        });

        let mut report = RunReport {
            config: config.id.clone(),
            strategy,
            prior,
            executor,
            documents: Vec::new(),
            summary: changes.summary,
            resources: outcome.resources.len(),
            rejected: outcome.rejected.len(),
            warnings,
            duration: Duration::ZERO,
        };

        let Some(executor) = executor else {
            debug!(config = %config.id, "nothing to publish");
            report.duration = start.elapsed();
            self.notify(&RunEvent::ExecutionEnd {
                config: config.id.clone(),
                documents: 0,
            });
            return Ok(report);
        };

        self.check(run_deadline, run_deadline, Stage::Run)?;
        self.set_state(EngineState::Executing);
        let ctx = ExecutionContext {
            config,
            store: &self.store,
            started,
        };
        let plan = executor.plan(&ctx, previous.as_ref(), &outcome.resources, &changes)?;

        self.set_state(EngineState::Writing);
        let write_deadline = earliest(run_deadline, limits.write.map(|d| Instant::now() + d));
        for document in &plan.documents {
            self.check(write_deadline, run_deadline, Stage::Write)?;
            self.writer.write_document(config, document)?;
            debug!(config = %config.id, uri = %document.uri, entries = document.len(), "wrote document");
            self.notify(&RunEvent::CompletedDocument(document.to_ref()));
        }
        self.check(write_deadline, run_deadline, Stage::Write)?;
        self.writer
            .write_capability_index(config, &plan.state.capability_index)?;

        self.check(run_deadline, run_deadline, Stage::Run)?;
        self.set_state(EngineState::Committing);
        let documents = plan.refs();
        self.store.save_snapshot(
            &config.id,
            StateCommit {
                expected: previous.as_ref().and_then(|state| state.latest),
                state: plan.state,
            },
        )?;

        report.documents = documents;
        report.duration = start.elapsed();
        info!(
            config = %config.id,
            %executor,
            documents = report.documents.len(),
            duration_ms = report.duration.as_millis() as u64,
            "run completed"
        );
        self.notify(&RunEvent::ExecutionEnd {
            config: config.id.clone(),
            documents: report.documents.len(),
        });
        Ok(report)
    }

    fn check(
        &self,
        deadline: Option<Instant>,
        run_deadline: Option<Instant>,
        stage: Stage,
    ) -> EngineResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(EngineError::Cancelled);
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(EngineError::Timeout {
                stage: stage_for(run_deadline, stage),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("state", &self.state())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Blames the run deadline when it has passed, else `stage`.
fn stage_for(run_deadline: Option<Instant>, stage: Stage) -> Stage {
    if run_deadline.is_some_and(|d| Instant::now() >= d) {
        Stage::Run
    } else {
        stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunLimits;
    use crate::observer::RecordingObserver;
    use crate::writer::MemoryWriter;
    use rspub_core::MemorySource;
    use rspub_model::{ChangeKind, DocumentId, DocumentKind, Strategy};
    use rspub_store::{InMemoryBackend, StoreBackend, STATE_BLOB};

    struct Fixture {
        engine: SyncEngine,
        source: Arc<MemorySource>,
        writer: Arc<MemoryWriter>,
        backend: Arc<InMemoryBackend>,
        config: Configuration,
    }

    fn fixture_with(options: EngineOptions) -> Fixture {
        let source = Arc::new(MemorySource::new());
        source.add_dir("/res");
        let writer = Arc::new(MemoryWriter::new());
        let backend = Arc::new(InMemoryBackend::new());
        let engine = SyncEngine::new(
            StateStore::new(backend.clone()),
            source.clone(),
            writer.clone(),
            options.with_concurrency(2),
        );
        let config = Configuration::new(ConfigId::new("test").unwrap(), "/res")
            .with_url_prefix("http://example.com/res")
            .with_strategy(Strategy::IncChangelist);
        Fixture {
            engine,
            source,
            writer,
            backend,
            config,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(EngineOptions::new())
    }

    fn state_bytes(f: &Fixture) -> Option<Vec<u8>> {
        f.backend.read(&f.config.id, STATE_BLOB).unwrap()
    }

    #[test]
    fn first_run_publishes_resourcelist() {
        let f = fixture();
        f.source.add_file("/res/a.txt", b"a");
        f.source.add_file("/res/b.txt", b"b");
        f.source.add_file("/res/c.txt", b"c");

        let report = f.engine.run(&f.config).unwrap();

        assert_eq!(report.prior, PriorState::NoHistory);
        assert_eq!(report.executor, Some(ExecutorKind::Resourcelist));
        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].id, DocumentId::new(1, 1));
        assert_eq!(report.documents[0].entries, 3);
        assert_eq!(report.summary.created, 3);
        assert_eq!(f.engine.state(), EngineState::Completed);

        let index = f.writer.last_index().unwrap();
        assert_eq!(index.documents(DocumentKind::Resourcelist).len(), 1);
        assert_eq!(f.engine.capability_index(&f.config.id).unwrap(), index);

        let stats = f.engine.stats();
        assert_eq!(stats.runs_completed, 1);
        assert_eq!(stats.documents_written, 1);
    }

    #[test]
    fn unchanged_resources_publish_nothing() {
        let f = fixture();
        f.source.add_file("/res/a.txt", b"a");
        f.engine.run(&f.config).unwrap();
        let before = state_bytes(&f);

        let report = f.engine.run(&f.config).unwrap();

        assert_eq!(report.prior, PriorState::HasHistoryNoChanges);
        assert_eq!(report.executor, None);
        assert!(!report.published());
        assert_eq!(state_bytes(&f), before);
        assert_eq!(f.writer.documents().len(), 1);
        assert_eq!(f.writer.index_writes(), 1);
    }

    #[test]
    fn incremental_changelist_after_changes() {
        let f = fixture();
        f.source.add_file("/res/a.txt", b"a");
        f.source.add_file("/res/b.txt", b"b");
        f.source.add_file("/res/c.txt", b"c");
        f.engine.run(&f.config).unwrap();

        f.source.remove("/res/a.txt");
        f.source.add_file("/res/b.txt", b"b2");
        let report = f.engine.run(&f.config).unwrap();

        assert_eq!(report.executor, Some(ExecutorKind::IncChangelist));
        assert_eq!(report.documents[0].id, DocumentId::new(1, 2));
        let document = f.writer.documents().pop().unwrap();
        let kinds: Vec<_> = document.changes().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ChangeKind::Deleted, ChangeKind::Updated]);
        assert_eq!(document.from, Some(f.writer.documents()[0].completed));
        let snapshot = f.engine.store().load_snapshot(&f.config.id).unwrap().unwrap();
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn strategy_override_and_start_new() {
        let f = fixture();
        f.source.add_file("/res/a.txt", b"a");
        f.engine.run(&f.config).unwrap();

        f.source.add_file("/res/b.txt", b"b");
        let report = f
            .engine
            .run_with(&f.config, RunOptions::new().with_strategy(Strategy::NewChangelist))
            .unwrap();
        assert_eq!(report.executor, Some(ExecutorKind::NewChangelist));
        assert_eq!(report.documents[0].id, DocumentId::new(2, 1));

        let report = f.engine.run_with(&f.config, RunOptions::new().start_new()).unwrap();
        assert_eq!(report.prior, PriorState::NoHistory);
        assert_eq!(report.executor, Some(ExecutorKind::Resourcelist));
        assert_eq!(report.documents[0].id, DocumentId::new(3, 1));
        let index = f.engine.capability_index(&f.config.id).unwrap();
        assert!(index.documents(DocumentKind::Changelist).is_empty());
    }

    #[test]
    fn write_failure_commits_nothing() {
        let f = fixture();
        f.source.add_file("/res/a.txt", b"a");
        f.writer.fail_on(0);

        let err = f.engine.run(&f.config).unwrap_err();

        assert!(matches!(err, EngineError::DocumentWrite(_)));
        assert!(err.is_retryable());
        assert_eq!(state_bytes(&f), None);
        assert_eq!(f.engine.state(), EngineState::Error);
        assert_eq!(f.engine.stats().runs_failed, 1);
        assert!(f.engine.stats().last_error.is_some());

        f.writer.heal();
        let report = f.engine.run(&f.config).unwrap();
        assert_eq!(report.documents[0].id, DocumentId::new(2, 1));
        assert!(f.engine.stats().last_error.is_none());
    }

    #[test]
    fn concurrent_run_is_refused() {
        let f = fixture();
        f.source.add_file("/res/a.txt", b"a");
        let _held = f.engine.store().lock(&f.config.id).unwrap();

        let err = f.engine.run(&f.config).unwrap_err();

        assert!(matches!(err, EngineError::RunInProgress { ref config } if config == "test"));
        assert_eq!(state_bytes(&f), None);
    }

    #[test]
    fn scan_timeout() {
        let limits = RunLimits::unlimited().with_scan_timeout(Duration::ZERO);
        let f = fixture_with(EngineOptions::new().with_limits(limits));
        f.source.add_file("/res/a.txt", b"a");

        let err = f.engine.run(&f.config).unwrap_err();

        assert!(matches!(err, EngineError::Timeout { stage: Stage::Scan }));
        assert_eq!(state_bytes(&f), None);
        assert!(f.writer.documents().is_empty());
    }

    #[test]
    fn write_timeout() {
        let limits = RunLimits::unlimited().with_write_timeout(Duration::from_millis(20));
        let f = fixture_with(EngineOptions::new().with_limits(limits));
        f.source.add_file("/res/a.txt", b"a");
        f.source.add_file("/res/b.txt", b"b");
        let config = f.config.clone().with_max_entries(1);
        f.writer.set_delay(Duration::from_millis(50));

        let err = f.engine.run(&config).unwrap_err();

        assert!(matches!(err, EngineError::Timeout { stage: Stage::Write }));
        assert_eq!(f.writer.documents().len(), 1);
        assert_eq!(state_bytes(&f), None);
    }

    struct CancelOnChanges(CancelHandle);

    impl RunObserver for CancelOnChanges {
        fn on_event(&self, event: &RunEvent) {
            if matches!(event, RunEvent::FoundChanges { .. }) {
                self.0.cancel();
            }
        }
    }

    #[test]
    fn cancel_during_run() {
        let f = fixture();
        f.source.add_file("/res/a.txt", b"a");
        f.engine
            .add_observer(Arc::new(CancelOnChanges(f.engine.cancel_handle())));

        let err = f.engine.run(&f.config).unwrap_err();

        assert!(matches!(err, EngineError::Cancelled));
        assert_eq!(state_bytes(&f), None);
        assert!(f.writer.documents().is_empty());
    }

    #[test]
    fn configuration_errors() {
        let f = fixture();
        let missing = f.config.clone().with_roots(["/nowhere"]);
        assert!(matches!(
            f.engine.run(&missing),
            Err(EngineError::Configuration(ConfigurationError::MissingRoot(_)))
        ));

        let mut unknown = f.config.clone();
        unknown.gate.builders.push("custom".into());
        assert!(matches!(
            f.engine.run(&unknown),
            Err(EngineError::Configuration(ConfigurationError::UnknownGateBuilder(ref name))) if name == "custom"
        ));

        let invalid = f.config.clone().with_max_entries(0);
        assert!(matches!(
            f.engine.run(&invalid),
            Err(EngineError::Configuration(ConfigurationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn observers_see_run_in_order() {
        let f = fixture();
        f.source.add_file("/res/a.txt", b"a");
        f.source.add_file("/res/.hidden", b"h");
        let observer = Arc::new(RecordingObserver::new());
        f.engine.add_observer(observer.clone());

        f.engine.run(&f.config).unwrap();

        let events = observer.events();
        assert!(matches!(events[0], RunEvent::ExecutionStart { .. }));
        assert!(matches!(events[1], RunEvent::RejectedResource { .. }));
        assert!(matches!(
            events[2],
            RunEvent::FoundChanges {
                executor: Some(ExecutorKind::Resourcelist),
                ..
            }
        ));
        assert!(matches!(events[3], RunEvent::CompletedDocument(_)));
        assert!(matches!(
            events[4],
            RunEvent::ExecutionEnd { documents: 1, .. }
        ));
        assert_eq!(events.len(), 5);
    }

    struct SlowSource {
        inner: MemorySource,
        delay: Duration,
    }

    impl ResourceSource for SlowSource {
        fn metadata(&self, path: &std::path::Path) -> std::io::Result<rspub_core::EntryMetadata> {
            self.inner.metadata(path)
        }

        fn list(&self, dir: &std::path::Path) -> std::io::Result<Vec<std::path::PathBuf>> {
            self.inner.list(dir)
        }

        fn canonicalize(&self, path: &std::path::Path) -> std::io::Result<std::path::PathBuf> {
            self.inner.canonicalize(path)
        }

        fn fingerprint(
            &self,
            path: &std::path::Path,
        ) -> std::io::Result<Option<rspub_model::Fingerprint>> {
            std::thread::sleep(self.delay);
            self.inner.fingerprint(path)
        }
    }

    #[test]
    fn scan_timeout_interrupts_hashing() {
        let source = SlowSource {
            inner: MemorySource::new(),
            delay: Duration::from_millis(200),
        };
        for i in 0..5 {
            source.inner.add_file(format!("/res/{i}.txt"), b"x");
        }
        let backend = Arc::new(InMemoryBackend::new());
        let limits = RunLimits::unlimited().with_scan_timeout(Duration::from_millis(50));
        let engine = SyncEngine::new(
            StateStore::new(backend.clone()),
            Arc::new(source),
            Arc::new(MemoryWriter::new()),
            EngineOptions::new().with_concurrency(1).with_limits(limits),
        );
        let config = Configuration::new(ConfigId::new("slow").unwrap(), "/res");

        let start = Instant::now();
        let err = engine.run(&config).unwrap_err();

        assert!(matches!(err, EngineError::Timeout { stage: Stage::Scan }));
        assert!(start.elapsed() < Duration::from_millis(600));
        assert_eq!(backend.read(&config.id, STATE_BLOB).unwrap(), None);
    }

    #[derive(Default)]
    struct StateRecorder {
        engine: std::sync::OnceLock<std::sync::Weak<SyncEngine>>,
        seen: parking_lot::Mutex<Vec<EngineState>>,
    }

    impl RunObserver for StateRecorder {
        fn on_event(&self, event: &RunEvent) {
            if matches!(event, RunEvent::ExecutionStart { .. }) {
                return;
            }
            if let Some(engine) = self.engine.get().and_then(std::sync::Weak::upgrade) {
                self.seen.lock().push(engine.state());
            }
        }
    }

    #[test]
    fn engine_is_active_only_while_running() {
        let source = Arc::new(MemorySource::new());
        source.add_file("/res/a.txt", b"a");
        let engine = Arc::new(SyncEngine::new(
            StateStore::new(Arc::new(InMemoryBackend::new())),
            source,
            Arc::new(MemoryWriter::new()),
            EngineOptions::new().with_concurrency(1),
        ));
        let recorder = Arc::new(StateRecorder::default());
        let _ = recorder.engine.set(Arc::downgrade(&engine));
        engine.add_observer(recorder.clone());
        assert!(!engine.state().is_active());

        let config = Configuration::new(ConfigId::new("active").unwrap(), "/res");
        engine.run(&config).unwrap();

        let seen = recorder.seen.lock().clone();
        assert_eq!(
            seen,
            vec![
                EngineState::Scanning,
                EngineState::Writing,
                EngineState::Committing
            ]
        );
        assert!(seen.iter().all(EngineState::is_active));
        assert_eq!(engine.state(), EngineState::Completed);
        assert!(!engine.state().is_active());
    }
}
