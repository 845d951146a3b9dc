use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strata_types::EntityId;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::row::{ChildQuery, Criteria, Row};
use crate::traits::{Backend, IdSource};

/// In-memory, `BTreeMap`-based backend.
///
/// Intended for tests and embedding. Relations are created on first insert.
/// Transactions snapshot the whole table set on `begin` and restore it on
/// `rollback`. Ids come from one sequence shared by every relation, so a
/// parent and its children never share an id, and the sequence never hands
/// out an id already used by an explicit insert.
pub struct InMemoryBackend {
    tables: Tables,
    snapshot: Option<Tables>,
    read_only: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct Tables {
    relations: BTreeMap<String, BTreeMap<EntityId, Row>>,
    last_id: u64,
}

impl InMemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            tables: Tables::default(),
            snapshot: None,
            read_only: false,
        }
    }

    /// Turn this backend read-only: every later write fails.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Returns `true` if writes are rejected.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Returns `true` while a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Number of rows stored in `relation`.
    pub fn len(&self, relation: &str) -> usize {
        self.tables.relations.get(relation).map_or(0, BTreeMap::len)
    }

    /// Returns `true` if no relation holds any row.
    pub fn is_empty(&self) -> bool {
        self.tables.relations.values().all(BTreeMap::is_empty)
    }

    /// Names of every relation that has held a row.
    pub fn relations(&self) -> Vec<String> {
        self.tables.relations.keys().cloned().collect()
    }

    /// All rows of `relation`, in id order.
    pub fn rows(&self, relation: &str) -> Vec<(EntityId, Row)> {
        self.tables
            .relations
            .get(relation)
            .map(|rows| rows.iter().map(|(id, row)| (*id, row.clone())).collect())
            .unwrap_or_default()
    }

    /// Export every relation and the id sequence as JSON.
    pub fn to_json(&self) -> StoreResult<String> {
        serde_json::to_string_pretty(&self.tables)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Rebuild a backend from [`to_json`](Self::to_json) output.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        let tables: Tables =
            serde_json::from_str(json).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Self {
            tables,
            snapshot: None,
            read_only: false,
        })
    }

    /// Write a JSON export to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let json = self.to_json()?;
        std::fs::write(path.as_ref(), json)?;
        debug!(path = %path.as_ref().display(), "in-memory backend saved");
        Ok(())
    }

    /// Load a JSON export from `path`.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    fn writable(&mut self) -> StoreResult<&mut Tables> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        Ok(&mut self.tables)
    }

    fn scan<F>(&self, relation: &str, mut keep: F) -> Vec<(EntityId, Row)>
    where
        F: FnMut(EntityId, &Row) -> bool,
    {
        self.tables
            .relations
            .get(relation)
            .map(|rows| {
                rows.iter()
                    .filter(|(id, row)| keep(**id, *row))
                    .map(|(id, row)| (*id, row.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for InMemoryBackend {
    fn begin(&mut self) -> StoreResult<()> {
        if self.snapshot.is_some() {
            return Err(StoreError::TransactionActive);
        }
        self.snapshot = Some(self.tables.clone());
        debug!("in-memory transaction started");
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.snapshot.take().ok_or(StoreError::NoTransaction)?;
        debug!("in-memory transaction committed");
        Ok(())
    }

    fn rollback(&mut self) -> StoreResult<()> {
        let saved = self.snapshot.take().ok_or(StoreError::NoTransaction)?;
        self.tables = saved;
        debug!("in-memory transaction rolled back");
        Ok(())
    }

    fn insert(&mut self, relation: &str, id: EntityId, row: &Row) -> StoreResult<EntityId> {
        let tables = self.writable()?;
        let rows = tables.relations.entry(relation.to_owned()).or_default();
        if rows.contains_key(&id) {
            return Err(StoreError::DuplicateRow {
                relation: relation.to_owned(),
                id,
            });
        }
        rows.insert(id, row.clone());
        tables.last_id = tables.last_id.max(id.get());
        Ok(id)
    }

    fn update(&mut self, relation: &str, id: EntityId, row: &Row) -> StoreResult<u64> {
        let tables = self.writable()?;
        match tables
            .relations
            .get_mut(relation)
            .and_then(|rows| rows.get_mut(&id))
        {
            Some(stored) => {
                for (name, value) in row.iter() {
                    stored.set(name, value.clone());
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn delete(&mut self, relation: &str, id: EntityId) -> StoreResult<u64> {
        let tables = self.writable()?;
        let removed = tables
            .relations
            .get_mut(relation)
            .and_then(|rows| rows.remove(&id));
        Ok(u64::from(removed.is_some()))
    }

    fn fetch(&mut self, relation: &str, id: EntityId) -> StoreResult<Option<Row>> {
        Ok(self
            .tables
            .relations
            .get(relation)
            .and_then(|rows| rows.get(&id))
            .cloned())
    }

    fn find(&mut self, relation: &str, criteria: &Criteria) -> StoreResult<Vec<(EntityId, Row)>> {
        Ok(self.scan(relation, |id, row| criteria.matches(id, row)))
    }

    fn query_children(
        &mut self,
        relation: &str,
        query: &ChildQuery<'_>,
    ) -> StoreResult<Vec<(EntityId, Row)>> {
        Ok(self.scan(relation, |_, row| query.matches(row)))
    }

    fn next_id(&mut self, relation: &str) -> StoreResult<EntityId> {
        let tables = self.writable()?;
        tables.last_id += 1;
        debug!(relation, id = tables.last_id, "in-memory id drawn");
        Ok(EntityId::new(tables.last_id))
    }
}

impl IdSource for InMemoryBackend {
    fn next_id(&mut self, root_relation: &str) -> StoreResult<EntityId> {
        Backend::next_id(self, root_relation)
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rows: usize = self.tables.relations.values().map(BTreeMap::len).sum();
        f.debug_struct("InMemoryBackend")
            .field("relations", &self.tables.relations.len())
            .field("rows", &rows)
            .field("in_transaction", &self.in_transaction())
            .field("read_only", &self.read_only)
            .finish()
    }
}
