//! # regsync Engine
//!
//! Sync orchestrator for regsync.
//!
//! This crate provides:
//! - Sync state machine (idle → checking → syncing up/down)
//! - Trigger scheduling: startup, periodic, debounced change, manual
//! - Store capability traits with in-memory fakes and a file-backed
//!   local store
//! - Status feed for host UI integration
//! - Remote filename codec carrying both platform counters
//!
//! ## Key invariants
//!
//! - At most one reconciliation cycle is in flight at any time;
//!   concurrent triggers are dropped, never queued
//! - At most one pending debounce deadline exists; a new change event
//!   replaces it
//! - Local overwrites are atomic (write to temp, rename over the target)
//! - Errors are cycle-local: recorded, pushed to the status feed, never
//!   a crash; recovery is the next periodic tick or a manual trigger

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod file_store;
mod orchestrator;
mod remote_name;
mod scheduler;
mod status;
mod store;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use file_store::FileLocalStore;
pub use orchestrator::SyncOrchestrator;
pub use remote_name::{encode_remote_name, parse_remote_name};
pub use scheduler::Trigger;
pub use status::{StatusCallback, StatusEvent, StatusFeed, SyncRecord, SyncState};
pub use store::{
    LocalStore, MemoryLocalStore, MemoryRemoteStore, RemoteFileInfo, RemoteStore, WatchCallback,
};
