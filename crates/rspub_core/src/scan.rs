//! Depth-first discovery of resources.

use crate::error::ScanWarning;
use crate::source::{EntryKind, EntryMetadata, ResourceSource};
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One step of a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanItem {
    /// A file was found.
    Resource {
        /// Path as walked.
        path: PathBuf,
        /// Its metadata.
        metadata: EntryMetadata,
    },
    /// An entry was skipped.
    Warning(ScanWarning),
}

/// Walks root locations through a [`ResourceSource`].
#[derive(Clone, Copy)]
pub struct Scanner<'a> {
    source: &'a dyn ResourceSource,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner reading through `source`.
    pub fn new(source: &'a dyn ResourceSource) -> Self {
        Self { source }
    }

    /// Starts a walk over `roots`, visited in the given order.
    pub fn walk<I, P>(&self, roots: I) -> Walk<'a>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Walk {
            source: self.source,
            roots: roots.into_iter().map(Into::into).collect(),
            stack: Vec::new(),
        }
    }
}

struct Frame {
    canonical: PathBuf,
    children: std::vec::IntoIter<PathBuf>,
}

/// A lazy, single-pass walk.
///
/// Files are yielded depth-first, siblings in byte order of their names.
/// A directory whose canonical path is already on the descent path closes a
/// symbolic link cycle and is skipped with a warning.
pub struct Walk<'a> {
    source: &'a dyn ResourceSource,
    roots: VecDeque<PathBuf>,
    stack: Vec<Frame>,
}

impl Walk<'_> {
    /// Current descent depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn visit(&mut self, path: PathBuf, is_root: bool) -> Option<ScanItem> {
        let metadata = match self.source.metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if is_root && e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "root location does not exist");
                return Some(ScanItem::Warning(ScanWarning::MissingRoot { path }));
            }
            Err(e) => return Some(self.warning(ScanWarning::io(path, &e))),
        };

        match metadata.kind {
            EntryKind::File => Some(ScanItem::Resource { path, metadata }),
            EntryKind::Directory => self.descend(path),
            EntryKind::Other => {
                debug!(path = %path.display(), "skipping special file");
                None
            }
        }
    }

    fn descend(&mut self, path: PathBuf) -> Option<ScanItem> {
        let canonical = match self.source.canonicalize(&path) {
            Ok(canonical) => canonical,
            Err(e) => return Some(self.warning(ScanWarning::io(path, &e))),
        };
        if self.stack.iter().any(|frame| frame.canonical == canonical) {
            return Some(self.warning(ScanWarning::Cycle { path }));
        }

        let mut children = match self.source.list(&path) {
            Ok(children) => children,
            Err(e) => return Some(self.warning(ScanWarning::io(path, &e))),
        };
        children.sort_by(|a, b| file_name_bytes(a).cmp(file_name_bytes(b)));
        debug!(path = %path.display(), children = children.len(), "descending");

        self.stack.push(Frame {
            canonical,
            children: children.into_iter(),
        });
        None
    }

    fn warning(&self, warning: ScanWarning) -> ScanItem {
        warn!(path = %warning.path().display(), %warning, "scan warning");
        ScanItem::Warning(warning)
    }
}

impl Iterator for Walk<'_> {
    type Item = ScanItem;

    fn next(&mut self) -> Option<ScanItem> {
        loop {
            let (path, is_root) = match self.stack.last_mut() {
                Some(frame) => match frame.children.next() {
                    Some(child) => (child, false),
                    None => {
                        self.stack.pop();
                        continue;
                    }
                },
                None => (self.roots.pop_front()?, true),
            };
            if let Some(item) = self.visit(path, is_root) {
                return Some(item);
            }
        }
    }
}

fn file_name_bytes(path: &Path) -> &[u8] {
    path.file_name()
        .map(|name| name.as_encoded_bytes())
        .unwrap_or_default()
}
