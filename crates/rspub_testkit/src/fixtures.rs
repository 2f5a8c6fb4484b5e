//! Publishers and resource trees for tests.

use rspub_core::{FsSource, MemorySource, ResourceSource};
use rspub_engine::{
    EngineOptions, EngineResult, MemoryWriter, RunOptions, RunReport, SyncEngine,
};
use rspub_model::{
    CapabilityIndex, ConfigId, Configuration, DocumentDescriptor, DocumentId, DocumentKind,
    Snapshot,
};
use rspub_store::{
    FileBackend, InMemoryBackend, PublishedState, StateStore, StoreBackend, STATE_BLOB,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// URL prefix of every test publisher.
pub const URL_PREFIX: &str = "http://example.com/res";

/// Routes engine logs to the test harness.
///
/// Honors `RUST_LOG` and defaults to `warn`. Safe to call from every test.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// A resource tree in a temporary directory, removed on drop.
pub struct TempTree {
    dir: TempDir,
}

impl TempTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir_all(dir.path().join("res")).expect("Failed to create resource dir");
        Self { dir }
    }

    /// The resource directory.
    pub fn root(&self) -> PathBuf {
        self.dir.path().join("res")
    }

    /// Directory for store data, next to the resources.
    pub fn state_dir(&self) -> PathBuf {
        self.dir.path().join("state")
    }

    /// Absolute path of a resource.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Creates or overwrites a file, creating parents.
    pub fn write(&self, relative: &str, content: &[u8]) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&path, content).expect("Failed to write file");
    }

    /// Removes a file or directory. Returns false if it did not exist.
    pub fn remove(&self, relative: &str) -> bool {
        let path = self.path(relative);
        if path.is_dir() {
            fs::remove_dir_all(&path).is_ok()
        } else {
            fs::remove_file(&path).is_ok()
        }
    }
}

impl Default for TempTree {
    fn default() -> Self {
        Self::new()
    }
}

enum Tree {
    Memory(Arc<MemorySource>),
    Disk(TempTree),
}

/// An engine wired to a resource tree, a store and a [`MemoryWriter`].
///
/// Resources are addressed relative to the resource directory.
pub struct TestPublisher {
    /// The engine.
    pub engine: SyncEngine,
    /// The writer every document goes to.
    pub writer: Arc<MemoryWriter>,
    /// The configuration passed to runs.
    pub config: Configuration,
    store: StateStore,
    faults: Option<Arc<InMemoryBackend>>,
    tree: Tree,
    options: EngineOptions,
}

impl TestPublisher {
    /// A publisher over an in-memory tree rooted at `/res` and an in-memory
    /// store.
    pub fn memory(id: &str) -> Self {
        Self::memory_with(id, EngineOptions::new().with_concurrency(2))
    }

    /// Like [`TestPublisher::memory`] with explicit engine options.
    pub fn memory_with(id: &str, options: EngineOptions) -> Self {
        let source = Arc::new(MemorySource::new());
        source.add_dir("/res");
        let backend = Arc::new(InMemoryBackend::new());
        let store = StateStore::new(backend.clone());
        let config = Self::configuration(id, "/res");
        Self::assemble(store, Some(backend), Tree::Memory(source), config, options)
    }

    /// A publisher over a temporary directory with a file-backed store.
    pub fn on_disk(id: &str) -> Self {
        let tree = TempTree::new();
        let backend = FileBackend::open(tree.state_dir()).expect("Failed to open file backend");
        let store = StateStore::new(Arc::new(backend));
        let config = Self::configuration(id, tree.root());
        Self::assemble(
            store,
            None,
            Tree::Disk(tree),
            config,
            EngineOptions::new().with_concurrency(2),
        )
    }

    fn configuration(id: &str, root: impl Into<PathBuf>) -> Configuration {
        Configuration::new(ConfigId::new(id).expect("Invalid config id"), root)
            .with_url_prefix(URL_PREFIX)
    }

    fn assemble(
        store: StateStore,
        faults: Option<Arc<InMemoryBackend>>,
        tree: Tree,
        config: Configuration,
        options: EngineOptions,
    ) -> Self {
        let writer = Arc::new(MemoryWriter::new());
        let source: Arc<dyn ResourceSource> = match &tree {
            Tree::Memory(source) => source.clone(),
            Tree::Disk(_) => Arc::new(FsSource::new()),
        };
        let engine = SyncEngine::new(store.clone(), source, writer.clone(), options.clone());
        Self {
            engine,
            writer,
            config,
            store,
            faults,
            tree,
            options,
        }
    }

    /// Changes the configuration.
    #[must_use]
    pub fn configure(mut self, f: impl FnOnce(Configuration) -> Configuration) -> Self {
        self.config = f(self.config);
        self
    }

    /// Replaces the engine with a fresh one over the same tree and store,
    /// as after a process restart. Observers and gate builders are dropped.
    #[must_use]
    pub fn restart(self) -> Self {
        let store = match &self.tree {
            Tree::Disk(tree) => StateStore::new(Arc::new(
                FileBackend::open(tree.state_dir()).expect("Failed to reopen file backend"),
            )),
            Tree::Memory(_) => self.store.clone(),
        };
        Self::assemble(store, self.faults, self.tree, self.config, self.options)
    }

    /// The resource directory.
    pub fn root(&self) -> PathBuf {
        self.config.resource_dir.clone()
    }

    /// Absolute path of a resource.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Published URI of a resource.
    pub fn uri(&self, relative: &str) -> String {
        self.config.identity_for(&self.path(relative))
    }

    /// Creates or overwrites a resource.
    pub fn write(&self, relative: &str, content: &[u8]) {
        match &self.tree {
            Tree::Memory(source) => source.add_file(self.path(relative), content),
            Tree::Disk(tree) => tree.write(relative, content),
        }
    }

    /// Removes a resource.
    pub fn delete(&self, relative: &str) -> bool {
        match &self.tree {
            Tree::Memory(source) => source.remove(self.path(relative)),
            Tree::Disk(tree) => tree.remove(relative),
        }
    }

    /// The in-memory tree, if this publisher has one.
    pub fn memory_source(&self) -> Option<&MemorySource> {
        match &self.tree {
            Tree::Memory(source) => Some(source),
            Tree::Disk(_) => None,
        }
    }

    /// The in-memory backend, for fault injection.
    ///
    /// # Panics
    ///
    /// Panics for on-disk publishers.
    pub fn faults(&self) -> &InMemoryBackend {
        self.faults
            .as_deref()
            .expect("Fault injection needs an in-memory publisher")
    }

    /// The state store.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Runs with the configuration's strategy.
    pub fn run(&self) -> EngineResult<RunReport> {
        self.engine.run(&self.config)
    }

    /// Runs with per-run options.
    pub fn run_with(&self, options: RunOptions) -> EngineResult<RunReport> {
        self.engine.run_with(&self.config, options)
    }

    /// The committed state.
    pub fn state(&self) -> Option<PublishedState> {
        self.store
            .load_state(&self.config.id)
            .expect("Failed to load state")
    }

    /// The committed state as stored.
    pub fn state_bytes(&self) -> Option<Vec<u8>> {
        self.store
            .backend()
            .read(&self.config.id, STATE_BLOB)
            .expect("Failed to read state blob")
    }

    /// Last document id issued, by successful or failed runs.
    pub fn last_sequence(&self) -> Option<DocumentId> {
        self.store
            .last_sequence(&self.config.id)
            .expect("Failed to read sequence")
    }

    /// Resources as a consumer of the live documents would see them.
    pub fn replay(&self) -> Snapshot {
        let index = self
            .engine
            .capability_index(&self.config.id)
            .expect("Failed to load index");
        replay(&self.writer.documents(), &index)
    }
}

/// Rebuilds the resource set from published documents.
///
/// Starts from the live resourcelists in `index` and applies the live
/// changelists in id order. Documents not in `index` are ignored.
pub fn replay(documents: &[DocumentDescriptor], index: &CapabilityIndex) -> Snapshot {
    let live = |kind: DocumentKind| {
        let mut live: Vec<&DocumentDescriptor> = index
            .documents(kind)
            .iter()
            .filter_map(|r| documents.iter().find(|d| d.uri == r.uri && d.id == r.id))
            .collect();
        live.sort_by_key(|d| d.id);
        live
    };

    let mut snapshot = Snapshot::new();
    for document in live(DocumentKind::Resourcelist) {
        for resource in document.resources() {
            snapshot.insert(resource.clone(), document.id);
        }
    }
    for document in live(DocumentKind::Changelist) {
        for change in document.changes() {
            snapshot.apply(change, document.id);
        }
    }
    snapshot
}

/// Paths of resources in a snapshot, relative to `root`.
pub fn relative_paths(snapshot: &Snapshot, root: &Path) -> Vec<String> {
    snapshot
        .descriptors()
        .filter_map(|d| d.path.strip_prefix(root).ok())
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .collect()
}
