//! # regsync Reconcile
//!
//! The pure functions behind regsync's replica reconciliation:
//! - Direction resolver (none / upload / download / conflict)
//! - Two-counter conflict detector
//! - Structural diff engine producing a reviewable [`DiffReport`]
//!
//! Everything in this crate is synchronous, side-effect free and operates
//! on in-memory snapshots, so it can be exercised at any time without
//! touching either store.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod conflict;
mod diff;
mod direction;
mod display;

pub use conflict::is_conflict;
pub use diff::{
    compare, ChangedEntity, CollectionCounts, CollectionDiff, DiffReport, DiffSummary,
    FieldChange, ModifiedEntity, AUDIT_FIELDS,
};
pub use direction::{resolve, Direction};
pub use display::{display_name, format_value};
