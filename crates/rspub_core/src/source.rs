//! Where resources are read from.

use crate::fingerprint::{fingerprint_bytes, fingerprint_reader};
use parking_lot::RwLock;
use rspub_model::Fingerprint;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file (a resource).
    File,
    /// A directory to descend into.
    Directory,
    /// Anything else; skipped.
    Other,
}

/// Metadata of an entry, after following symbolic links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Entry kind.
    pub kind: EntryKind,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
    /// Extra attributes copied into the resource descriptor.
    pub attributes: BTreeMap<String, String>,
}

/// Read access to a tree of resources.
///
/// Paths handed out by [`ResourceSource::list`] are the listed directory
/// joined with the child name, so walking through a symbolic link keeps the
/// link in the path. [`ResourceSource::canonicalize`] resolves links.
pub trait ResourceSource: Send + Sync {
    /// Returns the metadata of an entry.
    fn metadata(&self, path: &Path) -> io::Result<EntryMetadata>;

    /// Lists the children of a directory, in no particular order.
    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    /// Resolves symbolic links.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    /// Computes the content fingerprint. `None` if the source does not
    /// provide fingerprints.
    fn fingerprint(&self, path: &Path) -> io::Result<Option<Fingerprint>>;

    /// Returns true if the entry exists.
    fn exists(&self, path: &Path) -> bool {
        self.metadata(path).is_ok()
    }
}

/// The local filesystem.
#[derive(Debug, Clone)]
pub struct FsSource {
    fingerprints: bool,
}

impl FsSource {
    /// Creates a filesystem source that fingerprints file content.
    #[must_use]
    pub fn new() -> Self {
        Self { fingerprints: true }
    }

    /// Enables or disables content fingerprints.
    ///
    /// Without fingerprints changes are detected by size and modification
    /// time only.
    #[must_use]
    pub const fn with_fingerprints(mut self, enabled: bool) -> Self {
        self.fingerprints = enabled;
        self
    }
}

impl Default for FsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSource for FsSource {
    fn metadata(&self, path: &Path) -> io::Result<EntryMetadata> {
        let meta = fs::metadata(path)?;
        let kind = if meta.is_file() {
            EntryKind::File
        } else if meta.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::Other
        };
        Ok(EntryMetadata {
            kind,
            size: meta.len(),
            modified: meta.modified()?,
            attributes: BTreeMap::new(),
        })
    }

    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut children = Vec::new();
        for entry in fs::read_dir(dir)? {
            children.push(dir.join(entry?.file_name()));
        }
        Ok(children)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }

    fn fingerprint(&self, path: &Path) -> io::Result<Option<Fingerprint>> {
        if !self.fingerprints {
            return Ok(None);
        }
        let file = File::open(path)?;
        fingerprint_reader(file).map(Some)
    }
}

const MAX_LINK_HOPS: usize = 40;

#[derive(Debug, Clone)]
enum Node {
    File {
        content: Vec<u8>,
        modified: SystemTime,
        attributes: BTreeMap<String, String>,
    },
    Directory,
    Link(PathBuf),
}

/// An in-memory tree of resources.
///
/// Every write advances a private clock by one second, so modified files
/// always carry a newer timestamp. Paths can be made to fail with
/// `PermissionDenied` to simulate unreadable entries.
#[derive(Debug)]
pub struct MemorySource {
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
    failing: RwLock<BTreeSet<PathBuf>>,
    clock: AtomicU64,
}

impl MemorySource {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(BTreeMap::new()),
            failing: RwLock::new(BTreeSet::new()),
            clock: AtomicU64::new(1_600_000_000),
        }
    }

    fn tick(&self) -> SystemTime {
        let secs = self.clock.fetch_add(1, Ordering::SeqCst);
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn add_parents(nodes: &mut BTreeMap<PathBuf, Node>, path: &Path) {
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            nodes
                .entry(ancestor.to_path_buf())
                .or_insert(Node::Directory);
        }
    }

    /// Creates or overwrites a file. Missing parents are created.
    pub fn add_file(&self, path: impl AsRef<Path>, content: &[u8]) {
        self.add_file_with(path, content, BTreeMap::new());
    }

    /// Creates or overwrites a file carrying attributes.
    pub fn add_file_with(
        &self,
        path: impl AsRef<Path>,
        content: &[u8],
        attributes: BTreeMap<String, String>,
    ) {
        let path = path.as_ref();
        let modified = self.tick();
        let mut nodes = self.nodes.write();
        Self::add_parents(&mut nodes, path);
        nodes.insert(
            path.to_path_buf(),
            Node::File {
                content: content.to_vec(),
                modified,
                attributes,
            },
        );
    }

    /// Creates an empty directory and its parents.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut nodes = self.nodes.write();
        Self::add_parents(&mut nodes, path);
        nodes.insert(path.to_path_buf(), Node::Directory);
    }

    /// Creates a symbolic link at `path` pointing to the absolute `target`.
    pub fn add_link(&self, path: impl AsRef<Path>, target: impl Into<PathBuf>) {
        let path = path.as_ref();
        let mut nodes = self.nodes.write();
        Self::add_parents(&mut nodes, path);
        nodes.insert(path.to_path_buf(), Node::Link(target.into()));
    }

    /// Sets the modification time of a file. Returns false if it is not a file.
    pub fn set_modified(&self, path: impl AsRef<Path>, time: SystemTime) -> bool {
        match self.nodes.write().get_mut(path.as_ref()) {
            Some(Node::File { modified, .. }) => {
                *modified = time;
                true
            }
            _ => false,
        }
    }

    /// Removes an entry and everything below it.
    pub fn remove(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let mut nodes = self.nodes.write();
        let before = nodes.len();
        nodes.retain(|key, _| !key.starts_with(path));
        nodes.len() != before
    }

    /// Makes every access to `path` fail.
    pub fn fail(&self, path: impl Into<PathBuf>) {
        self.failing.write().insert(path.into());
    }

    /// Undoes [`MemorySource::fail`].
    pub fn heal(&self, path: impl AsRef<Path>) {
        self.failing.write().remove(path.as_ref());
    }

    fn check(&self, path: &Path) -> io::Result<()> {
        if self.failing.read().contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {}", path.display()),
            ));
        }
        Ok(())
    }

    fn resolve(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> io::Result<PathBuf> {
        let mut resolved = PathBuf::new();
        let mut hops = 0;
        for component in path.components() {
            resolved.push(component);
            while let Some(Node::Link(target)) = nodes.get(&resolved) {
                hops += 1;
                if hops > MAX_LINK_HOPS {
                    return Err(io::Error::new(
                        io::ErrorKind::Other,
                        "too many levels of symbolic links",
                    ));
                }
                resolved = target.clone();
            }
        }
        Ok(resolved)
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no such entry: {}", path.display()),
        )
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSource for MemorySource {
    fn metadata(&self, path: &Path) -> io::Result<EntryMetadata> {
        self.check(path)?;
        let nodes = self.nodes.read();
        let resolved = Self::resolve(&nodes, path)?;
        match nodes.get(&resolved) {
            Some(Node::File {
                content,
                modified,
                attributes,
            }) => Ok(EntryMetadata {
                kind: EntryKind::File,
                size: content.len() as u64,
                modified: *modified,
                attributes: attributes.clone(),
            }),
            Some(Node::Directory) => Ok(EntryMetadata {
                kind: EntryKind::Directory,
                size: 0,
                modified: UNIX_EPOCH,
                attributes: BTreeMap::new(),
            }),
            Some(Node::Link(_)) | None => Err(Self::not_found(path)),
        }
    }

    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        self.check(dir)?;
        let nodes = self.nodes.read();
        let resolved = Self::resolve(&nodes, dir)?;
        match nodes.get(&resolved) {
            Some(Node::Directory) => {}
            Some(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    format!("not a directory: {}", dir.display()),
                ))
            }
            None => return Err(Self::not_found(dir)),
        }
        Ok(nodes
            .keys()
            .filter(|key| key.parent() == Some(resolved.as_path()))
            .filter_map(|key| key.file_name())
            .map(|name| dir.join(name))
            .collect())
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        self.check(path)?;
        let nodes = self.nodes.read();
        let resolved = Self::resolve(&nodes, path)?;
        if nodes.contains_key(&resolved) {
            Ok(resolved)
        } else {
            Err(Self::not_found(path))
        }
    }

    fn fingerprint(&self, path: &Path) -> io::Result<Option<Fingerprint>> {
        self.check(path)?;
        let nodes = self.nodes.read();
        let resolved = Self::resolve(&nodes, path)?;
        match nodes.get(&resolved) {
            Some(Node::File { content, .. }) => Ok(Some(fingerprint_bytes(content))),
            _ => Err(Self::not_found(path)),
        }
    }
}
