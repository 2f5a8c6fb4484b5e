//! SHA-256 content fingerprints.

use crate::collect::ScanControl;
use crate::error::{ScanAbort, ScanWarning};
use crate::source::ResourceSource;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use rspub_model::{Fingerprint, ResourceDescriptor};
use sha2::{Digest, Sha256};
use std::io::{self, Read};
use std::sync::Arc;
use tracing::warn;

const BUF_SIZE: usize = 64 * 1024;

/// Fingerprints an in-memory buffer.
#[must_use]
pub fn fingerprint_bytes(data: &[u8]) -> Fingerprint {
    Fingerprint(Sha256::digest(data).into())
}

/// Fingerprints everything a reader yields.
pub fn fingerprint_reader(mut reader: impl Read) -> io::Result<Fingerprint> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(Fingerprint(hasher.finalize().into()))
}

/// The thread pool content is hashed on.
///
/// Built once and shared by every scan. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct FingerprintPool {
    pool: Option<Arc<ThreadPool>>,
    threads: usize,
}

impl FingerprintPool {
    /// Builds a pool of `threads` threads (at least one).
    ///
    /// If the threads cannot be spawned, hashing falls back to the global
    /// rayon pool.
    #[must_use]
    pub fn new(threads: usize) -> Self {
        let threads = threads.max(1);
        let pool = match ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("rspub-fingerprint-{i}"))
            .build()
        {
            Ok(pool) => Some(Arc::new(pool)),
            Err(e) => {
                warn!(error = %e, "fingerprint pool unavailable, using the global pool");
                None
            }
        };
        Self { pool, threads }
    }

    /// One thread per core.
    #[must_use]
    pub fn per_core() -> Self {
        Self::new(std::thread::available_parallelism().map_or(1, |n| n.get()))
    }

    /// Number of threads requested.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

/// Fingerprints resources on the control's pool.
///
/// Resources whose content cannot be read are dropped and reported. The
/// result is sorted by identity whatever order the threads finish in.
///
/// # Errors
///
/// The deadline and cancel flag are checked before each resource; once
/// either trips, no further resource is read.
pub fn fingerprint_resources(
    source: &dyn ResourceSource,
    resources: Vec<ResourceDescriptor>,
    control: &ScanControl<'_>,
) -> Result<(Vec<ResourceDescriptor>, Vec<ScanWarning>), ScanAbort> {
    let work = |resource: ResourceDescriptor| -> Result<Result<_, ScanWarning>, ScanAbort> {
        control.check()?;
        Ok(match source.fingerprint(&resource.path) {
            Ok(Some(fingerprint)) => Ok(resource.with_fingerprint(fingerprint)),
            Ok(None) => Ok(resource),
            Err(e) => Err(ScanWarning::io(&resource.path, &e)),
        })
    };

    let results: Vec<Result<ResourceDescriptor, ScanWarning>> = control
        .pool
        .install(|| resources.into_par_iter().map(work).collect::<Result<Vec<_>, _>>())?;

    let mut fingerprinted = Vec::with_capacity(results.len());
    let mut warnings = Vec::new();
    for result in results {
        match result {
            Ok(resource) => fingerprinted.push(resource),
            Err(warning) => {
                warn!(path = %warning.path().display(), %warning, "skipping resource");
                warnings.push(warning);
            }
        }
    }
    fingerprinted.sort_by(|a, b| a.identity.cmp(&b.identity));
    Ok((fingerprinted, warnings))
}
