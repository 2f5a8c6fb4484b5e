//! # rspub Engine
//!
//! Synchronization strategy engine for ResourceSync source publishers.
//!
//! This crate provides:
//! - Strategy selection (resourcelist, new changelist, incremental changelist)
//! - The three executors
//! - Run orchestration with deadlines and cancellation
//! - The document writer and run observer seams
//!
//! ## Run Flow
//!
//! 1. Validate the configuration and build its gate
//! 2. Take the per-configuration lock
//! 3. Scan, gate and fingerprint resources
//! 4. Diff against the last published snapshot
//! 5. Select an executor and plan documents
//! 6. Write documents, then the capability index
//! 7. Commit snapshot, baseline and capability index in one step
//!
//! ## Key Invariants
//!
//! - A failed run commits nothing
//! - Document ids strictly increase, even across failed runs
//! - An unchanged resource set publishes nothing
//! - Baseline plus the live changelists reproduce the snapshot

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod executor;
mod observer;
mod report;
mod selector;
mod writer;

pub use config::{EngineOptions, RunLimits, RunOptions};
pub use engine::{CancelHandle, EngineState, EngineStats, SyncEngine};
pub use error::{DocumentWriteError, EngineError, EngineResult, Stage};
pub use executor::Plan;
pub use observer::{RecordingObserver, RunEvent, RunObserver};
pub use report::{RunReport, RunWarning};
pub use selector::{ExecutorKind, PriorState};
pub use writer::{DocumentWriter, MemoryWriter};
