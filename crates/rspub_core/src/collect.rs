//! The scan → gate → fingerprint pipeline.

use crate::error::{GateEvaluationError, ScanAbort, ScanWarning};
use crate::fingerprint::{fingerprint_resources, FingerprintPool};
use crate::gate::ResourceGate;
use crate::scan::{ScanItem, Scanner};
use crate::source::ResourceSource;
use rspub_model::{Configuration, ResourceDescriptor};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Limits applied while collecting.
#[derive(Debug, Clone)]
pub struct ScanControl<'a> {
    /// Pool content is hashed on.
    pub pool: FingerprintPool,
    /// Give up after this instant.
    pub deadline: Option<Instant>,
    /// Give up once set.
    pub cancelled: Option<&'a AtomicBool>,
}

impl ScanControl<'_> {
    /// No deadline, no cancellation, one thread per core.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::with_pool(FingerprintPool::per_core())
    }

    /// No deadline, no cancellation, hashing on `pool`.
    #[must_use]
    pub fn with_pool(pool: FingerprintPool) -> Self {
        Self {
            pool,
            deadline: None,
            cancelled: None,
        }
    }

    pub(crate) fn check(&self) -> Result<(), ScanAbort> {
        if self
            .cancelled
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
        {
            return Err(ScanAbort::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(ScanAbort::TimedOut);
        }
        Ok(())
    }
}

/// Everything a scan found.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Eligible resources, fingerprinted and sorted by identity.
    pub resources: Vec<ResourceDescriptor>,
    /// Paths the gate turned away.
    pub rejected: Vec<PathBuf>,
    /// Entries skipped because of I/O problems.
    pub warnings: Vec<ScanWarning>,
    /// Predicates that failed; their resources are also in `rejected`.
    pub gate_errors: Vec<GateEvaluationError>,
}

/// Scans the configuration's roots and returns the eligible resources.
///
/// The gate sees each descriptor before its content is fingerprinted, so
/// rejected files are never read.
///
/// # Errors
///
/// Returns a [`ScanAbort`] when the deadline passes or the run is
/// cancelled. Per-resource problems are reported in the outcome instead.
pub fn collect_resources(
    config: &Configuration,
    source: &dyn ResourceSource,
    gate: &ResourceGate,
    control: &ScanControl<'_>,
) -> Result<ScanOutcome, ScanAbort> {
    let mut outcome = ScanOutcome::default();
    let mut candidates = Vec::new();
    let mut seen = BTreeSet::new();

    for item in Scanner::new(source).walk(config.roots.iter().cloned()) {
        control.check()?;
        let (path, metadata) = match item {
            ScanItem::Resource { path, metadata } => (path, metadata),
            ScanItem::Warning(warning) => {
                outcome.warnings.push(warning);
                continue;
            }
        };

        let mut descriptor = ResourceDescriptor::new(
            config.identity_for(&path),
            path,
            metadata.size,
            metadata.modified,
        );
        descriptor.metadata = metadata.attributes;

        match gate.check(&descriptor) {
            Ok(true) => {
                if seen.insert(descriptor.identity.clone()) {
                    candidates.push(descriptor);
                }
            }
            Ok(false) => {
                debug!(path = %descriptor.path.display(), "rejected by gate");
                outcome.rejected.push(descriptor.path);
            }
            Err(e) => {
                warn!(path = %descriptor.path.display(), error = %e, "gate predicate failed, rejecting");
                outcome.gate_errors.push(e);
                outcome.rejected.push(descriptor.path);
            }
        }
    }
    control.check()?;

    let (resources, warnings) = fingerprint_resources(source, candidates, control)?;
    outcome.resources = resources;
    outcome.warnings.extend(warnings);

    info!(
        config = %config.id,
        resources = outcome.resources.len(),
        rejected = outcome.rejected.len(),
        warnings = outcome.warnings.len(),
        "scan complete"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::predicate::from_fn;
    use crate::gate::{DefaultGateBuilder, ResourceGateBuilder};
    use crate::source::MemorySource;
    use rspub_model::ConfigId;
    use std::sync::Arc;
    use std::time::Duration;

    fn config() -> Configuration {
        Configuration::new(ConfigId::new("c").unwrap(), "/r").with_url_prefix("http://e.com/r")
    }

    fn default_gate(config: &Configuration) -> ResourceGate {
        ResourceGateBuilder::new()
            .with(Arc::new(DefaultGateBuilder::for_configuration(config)))
            .build()
            .unwrap()
    }

    #[test]
    fn collects_eligible_resources() {
        let source = MemorySource::new();
        source.add_file("/r/b.txt", b"b");
        source.add_file("/r/a.txt", b"a");
        source.add_file("/r/.hidden", b"h");
        source.add_file("/r/metadata/resourcelist_0004_0001.xml", b"<x/>");
        let config = config();

        let outcome = collect_resources(
            &config,
            &source,
            &default_gate(&config),
            &ScanControl::unlimited(),
        )
        .unwrap();

        let identities: Vec<_> = outcome.resources.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(identities, vec!["http://e.com/r/a.txt", "http://e.com/r/b.txt"]);
        assert!(outcome.resources.iter().all(|r| r.fingerprint.is_some()));
        assert_eq!(outcome.rejected.len(), 2);
        assert!(outcome.warnings.is_empty());
    }

    struct CountingSource {
        inner: MemorySource,
        reads: std::sync::atomic::AtomicUsize,
    }

    impl ResourceSource for CountingSource {
        fn metadata(&self, path: &std::path::Path) -> std::io::Result<crate::EntryMetadata> {
            self.inner.metadata(path)
        }

        fn list(&self, dir: &std::path::Path) -> std::io::Result<Vec<PathBuf>> {
            self.inner.list(dir)
        }

        fn canonicalize(&self, path: &std::path::Path) -> std::io::Result<PathBuf> {
            self.inner.canonicalize(path)
        }

        fn fingerprint(
            &self,
            path: &std::path::Path,
        ) -> std::io::Result<Option<rspub_model::Fingerprint>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.fingerprint(path)
        }
    }

    #[test]
    fn rejected_files_are_not_read() {
        let source = CountingSource {
            inner: MemorySource::new(),
            reads: Default::default(),
        };
        source.inner.add_file("/r/ok", b"ok");
        source.inner.add_file("/r/.secret", b"s");
        source.inner.add_file("/r/metadata/changelist_0001_0002.xml", b"<x/>");
        let config = config();

        let outcome = collect_resources(
            &config,
            &source,
            &default_gate(&config),
            &ScanControl::unlimited(),
        )
        .unwrap();
        assert_eq!(outcome.resources.len(), 1);
        assert_eq!(source.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn gate_failures_reject_and_report() {
        let source = MemorySource::new();
        source.add_file("/r/a", b"a");
        source.add_file("/r/b", b"b");
        let gate = ResourceGate::new(
            vec![],
            vec![from_fn("picky", |r| {
                if r.path.ends_with("b") {
                    Err("cannot inspect".into())
                } else {
                    Ok(false)
                }
            })],
        );

        let outcome =
            collect_resources(&config(), &source, &gate, &ScanControl::unlimited()).unwrap();
        assert_eq!(outcome.resources.len(), 1);
        assert_eq!(outcome.rejected, vec![PathBuf::from("/r/b")]);
        assert_eq!(outcome.gate_errors.len(), 1);
    }

    #[test]
    fn overlapping_roots_yield_each_resource_once() {
        let source = MemorySource::new();
        source.add_file("/r/sub/a", b"a");
        let config = config().with_roots(["/r", "/r/sub"]);

        let outcome = collect_resources(
            &config,
            &source,
            &ResourceGate::accept_all(),
            &ScanControl::unlimited(),
        )
        .unwrap();
        assert_eq!(outcome.resources.len(), 1);
    }

    #[test]
    fn attributes_become_metadata() {
        let source = MemorySource::new();
        source.add_file_with(
            "/r/a",
            b"a",
            [("mime".to_string(), "text/plain".to_string())].into(),
        );
        let outcome = collect_resources(
            &config(),
            &source,
            &ResourceGate::accept_all(),
            &ScanControl::unlimited(),
        )
        .unwrap();
        assert_eq!(
            outcome.resources[0].metadata.get("mime").map(String::as_str),
            Some("text/plain")
        );
    }

    #[test]
    fn cancellation_and_deadline() {
        let source = MemorySource::new();
        source.add_file("/r/a", b"a");

        let flag = AtomicBool::new(true);
        let cancelled = ScanControl {
            cancelled: Some(&flag),
            ..ScanControl::unlimited()
        };
        assert_eq!(
            collect_resources(&config(), &source, &ResourceGate::accept_all(), &cancelled)
                .unwrap_err(),
            ScanAbort::Cancelled
        );

        let expired = ScanControl {
            deadline: Some(Instant::now() - Duration::from_millis(1)),
            ..ScanControl::unlimited()
        };
        assert_eq!(
            collect_resources(&config(), &source, &ResourceGate::accept_all(), &expired)
                .unwrap_err(),
            ScanAbort::TimedOut
        );
    }
}
