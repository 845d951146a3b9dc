//! Storage backend contract for Strata.
//!
//! The mapping engine never talks to a database, XML tree, or delimited
//! file directly. It drives a [`Backend`]: a small capability surface for
//! writing and reading rows of named relations keyed by entity id, plus
//! optional transaction control. Ids come from an [`IdSource`], which may be
//! the backend's own auto-increment or an external counter.
//!
//! # Backends
//!
//! - [`InMemoryBackend`] -- `BTreeMap`-based backend for tests and embedding,
//!   with snapshot transactions, a read-only mode, and JSON export
//!
//! # Design Rules
//!
//! 1. Every row of one entity is keyed by the same [`EntityId`](strata_types::EntityId).
//! 2. Backends store scalars as [`Value`](strata_types::Value)s and never interpret them.
//! 3. Row order within a relation is ascending id order.
//! 4. Unsupported capabilities fail with [`StoreError::Unsupported`], never silently.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod counter;
pub mod error;
pub mod memory;
pub mod row;
pub mod traits;

pub use counter::{CounterIdSource, SequenceIdSource};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryBackend;
pub use row::{ChildQuery, Criteria, Row};
pub use traits::{Backend, IdSource};
