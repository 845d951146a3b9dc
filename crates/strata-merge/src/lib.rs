//! Collection reconciliation for Strata.
//!
//! Application code holding an edited collection of entities reconciles it
//! against the collection last loaded from storage. The result keeps
//! unchanged entities as they were, turns edited ones into updates of their
//! stored rows, adds unknown ones as new rows, and flags vanished ones for
//! deletion, so one `put` of the parent brings storage in line.
//!
//! # Key Types
//!
//! - [`reconcile`] -- reconcile in place, driven by identity and content comparators
//! - [`ReconcileReport`] -- per-outcome counts; [`ReconcileReport::changed`] is the summary flag

pub mod error;
pub mod reconcile;

pub use error::{MergeError, MergeResult};
pub use reconcile::{reconcile, ReconcileReport};
