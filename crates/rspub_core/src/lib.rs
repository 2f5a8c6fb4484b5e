//! # rspub Core
//!
//! Discovery and comparison of resources.
//!
//! This crate provides:
//! - [`ResourceSource`] and its filesystem ([`FsSource`]) and in-memory
//!   ([`MemorySource`]) implementations
//! - [`Scanner`], a lazy depth-first walk over root locations
//! - [`ResourceGate`], composable accept/reject predicates assembled by
//!   [`GateBuilder`]s
//! - [`diff`], classifying resources against a [`Snapshot`](rspub_model::Snapshot)
//! - [`collect_resources`], the scan → gate → fingerprint pipeline
//!
//! ## Example
//!
//! ```rust
//! use rspub_core::{diff, MemorySource, ResourceGate, Scanner};
//! use rspub_model::Snapshot;
//!
//! let source = MemorySource::new();
//! source.add_file("/res/a.txt", b"alpha");
//! source.add_file("/res/b.txt", b"beta");
//!
//! let found: Vec<_> = Scanner::new(&source).walk(["/res"]).collect();
//! assert_eq!(found.len(), 2);
//! assert!(ResourceGate::accept_all().is_accept_all());
//! assert!(diff(&Snapshot::new(), &[]).records.is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collect;
mod diff;
mod error;
mod fingerprint;
pub mod gate;
mod scan;
mod source;

pub use collect::{collect_resources, ScanControl, ScanOutcome};
pub use diff::{diff, Diff};
pub use error::{GateEvaluationError, ScanAbort, ScanWarning};
pub use fingerprint::{
    fingerprint_bytes, fingerprint_reader, fingerprint_resources, FingerprintPool,
};
pub use gate::{
    DefaultGateBuilder, GateBuilder, Predicate, ResourceGate, ResourceGateBuilder,
    SelectorGateBuilder, SharedPredicate,
};
pub use scan::{ScanItem, Scanner, Walk};
pub use source::{EntryKind, EntryMetadata, FsSource, MemorySource, ResourceSource};
