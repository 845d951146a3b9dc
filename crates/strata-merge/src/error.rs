//! Error types for the merge crate.

use strata_types::EntityState;

/// Errors that can occur during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// The old collection must be a stored baseline; an entry already
    /// flagged deleted cannot be reconciled.
    #[error("baseline entry {index} is {state}, expected a stored entity")]
    InvalidBaseline { index: usize, state: EntityState },
}

/// Convenience alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;
