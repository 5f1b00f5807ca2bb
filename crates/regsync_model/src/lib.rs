//! # regsync Model
//!
//! Snapshot data model for regsync.
//!
//! This crate provides:
//! - `Snapshot`: a full point-in-time copy of the record store
//! - `Entity`: a single record with an id and an arbitrary field set
//! - `Metadata`: the two per-platform sync counters
//! - JSON encoding/decoding of whole snapshots

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod entity;
mod error;
mod snapshot;
mod types;

pub use entity::{Entity, EntityId};
pub use error::{ModelError, ModelResult};
pub use snapshot::{Metadata, Snapshot};
pub use types::Timestamp;
