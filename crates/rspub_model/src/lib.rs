//! # rspub Model
//!
//! Value types shared by every layer of the rspub synchronization engine.
//!
//! This crate provides:
//! - `ResourceDescriptor` for scanned resources
//! - `Snapshot` for the last published resource state
//! - `ChangeRecord` for diff output
//! - `DocumentDescriptor` and `CapabilityIndex` for emitted documents
//! - `Configuration` and `Strategy` for run setup
//! - CBOR encoding/decoding with versioned envelopes
//!
//! This is a pure data crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change;
pub mod codec;
mod config;
mod document;
mod error;
mod resource;
mod snapshot;
mod strategy;

pub use change::{ChangeKind, ChangeRecord, ChangeSummary};
pub use config::{
    ConfigId, Configuration, ConfigurationError, GateDefinition, Selector, DEFAULT_MAX_ENTRIES,
    DEFAULT_ZERO_FILL, MAX_ENTRIES_LIMIT,
};
pub use document::{
    CapabilityIndex, DocumentDescriptor, DocumentEntry, DocumentId, DocumentKind, DocumentLinks,
    DocumentRef,
};
pub use error::{CodecError, CodecResult};
pub use resource::{Fingerprint, ResourceDescriptor};
pub use snapshot::{Snapshot, SnapshotEntry};
pub use strategy::Strategy;
