use strata_types::EntityId;

use crate::error::{StoreError, StoreResult};
use crate::row::{ChildQuery, Criteria, Row};

/// Row-oriented storage backend.
///
/// A backend stores rows of named relations, each keyed by an entity id.
/// Relational backends map relations onto tables, tree backends onto
/// element names, delimited-text backends onto files; the mapping engine
/// only sees this surface.
///
/// All implementations must satisfy these invariants:
/// - Rows come back in ascending id order.
/// - A missing field in a stored row reads as null.
/// - Capabilities the backend lacks fail with [`StoreError::Unsupported`].
/// - Writes against a read-only backend fail with [`StoreError::ReadOnly`].
pub trait Backend {
    /// Start a transaction.
    fn begin(&mut self) -> StoreResult<()> {
        Err(StoreError::Unsupported { op: "begin" })
    }

    /// Commit the open transaction.
    fn commit(&mut self) -> StoreResult<()> {
        Err(StoreError::Unsupported { op: "commit" })
    }

    /// Discard the open transaction.
    fn rollback(&mut self) -> StoreResult<()> {
        Err(StoreError::Unsupported { op: "rollback" })
    }

    /// Insert a row under `id` and return the id it was stored under.
    fn insert(&mut self, relation: &str, id: EntityId, row: &Row) -> StoreResult<EntityId>;

    /// Overwrite the given fields of the row stored under `id`; fields absent
    /// from `row` keep their stored value. Returns the number of rows affected.
    fn update(&mut self, relation: &str, id: EntityId, row: &Row) -> StoreResult<u64>;

    /// Remove the row stored under `id`. Returns the number of rows affected.
    fn delete(&mut self, relation: &str, id: EntityId) -> StoreResult<u64>;

    /// Read the row stored under `id`.
    ///
    /// Returns `Ok(None)` if no such row exists.
    fn fetch(&mut self, relation: &str, id: EntityId) -> StoreResult<Option<Row>>;

    /// Read every row of `relation` matching `criteria`.
    fn find(&mut self, relation: &str, criteria: &Criteria) -> StoreResult<Vec<(EntityId, Row)>>;

    /// Read the rows of `relation` linked to one parent.
    ///
    /// Default implementation scans the relation with [`find`](Self::find).
    fn query_children(
        &mut self,
        relation: &str,
        query: &ChildQuery<'_>,
    ) -> StoreResult<Vec<(EntityId, Row)>> {
        let rows = self.find(relation, &Criteria::All)?;
        Ok(rows.into_iter().filter(|(_, row)| query.matches(row)).collect())
    }

    /// Backend-native id generation (auto-increment) for an entity whose
    /// root relation is `relation`.
    ///
    /// Ids must not repeat across relations: a parent and its children are
    /// drawn from the same source.
    fn next_id(&mut self, relation: &str) -> StoreResult<EntityId> {
        let _ = relation;
        Err(StoreError::Unsupported { op: "next_id" })
    }
}

/// Source of fresh entity ids.
///
/// Ids are scoped to the root relation of a binding chain: every row of one
/// entity shares the id handed out for its root relation.
pub trait IdSource {
    fn next_id(&mut self, root_relation: &str) -> StoreResult<EntityId>;
}
