//! # rspub Testkit
//!
//! Test utilities for rspub.
//!
//! This crate provides:
//! - Publishers wired to in-memory or on-disk stores
//! - Temporary resource trees on the real filesystem
//! - Property-based generators for resource trees and mutations
//! - Log capture setup for tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rspub_testkit::prelude::*;
//!
//! #[test]
//! fn publishes_baseline() {
//!     let publisher = TestPublisher::memory("demo");
//!     publisher.write("a.txt", b"alpha");
//!     let report = publisher.run().unwrap();
//!     assert_eq!(report.documents.len(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::{
        init_tracing, relative_paths, replay, TempTree, TestPublisher, URL_PREFIX,
    };
    pub use crate::generators::{
        apply_mutation, file_name_strategy, mutation_strategy, tree_strategy, Mutation,
    };
}
