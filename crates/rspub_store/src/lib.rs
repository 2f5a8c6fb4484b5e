//! # rspub Store
//!
//! Persistent state of the rspub synchronization engine.
//!
//! Each configuration owns a small set of named blobs:
//!
//! ```text
//! <store_root>/<config_id>/
//! ├─ LOCK          # Advisory lock, one run per configuration
//! ├─ config.json   # Saved configuration (versioned JSON envelope)
//! ├─ state         # Published state: snapshot, baseline, capability index
//! └─ sequence      # Last issued document id
//! ```
//!
//! Backends are **opaque blob stores**: they replace whole blobs atomically
//! and know nothing about their content. [`StateStore`] and
//! [`ConfigurationRepository`] own the formats.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For tests, with fault injection
//! - [`FileBackend`] - For persistent storage using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use rspub_model::ConfigId;
//! use rspub_store::{InMemoryBackend, StateStore};
//! use std::sync::Arc;
//!
//! let store = StateStore::new(Arc::new(InMemoryBackend::new()));
//! let config = ConfigId::new("example").unwrap();
//!
//! let first = store.restart_sequence(&config).unwrap();
//! let second = store.next_sequence(&config).unwrap();
//! assert!(second > first);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod lock;
mod memory;
mod repository;
mod state;

pub use backend::StoreBackend;
pub use error::{StoreError, StoreResult};
pub use file::FileBackend;
pub use lock::StoreLock;
pub use memory::InMemoryBackend;
pub use repository::{ConfigurationRepository, CONFIG_BLOB, CONFIG_FORMAT_VERSION};
pub use state::{PublishedState, StateCommit, StateStore, SEQUENCE_BLOB, STATE_BLOB};
