use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strata_types::EntityId;

use crate::error::StoreResult;
use crate::traits::IdSource;

/// Id source backed by a counter table, one counter per root relation.
///
/// Stands in for an external sequence table when the backend has no
/// auto-increment of its own.
///
/// Ids are unique per relation only: a child stored in another relation
/// may carry the same number as its parent. Use [`SequenceIdSource`] when
/// ids must be unique store-wide.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CounterIdSource {
    counters: BTreeMap<String, u64>,
    start: u64,
}

impl CounterIdSource {
    /// Counters starting at 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters whose first id is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            counters: BTreeMap::new(),
            start: first.saturating_sub(1),
        }
    }

    /// Last id handed out for `relation`, if any.
    pub fn last(&self, relation: &str) -> Option<EntityId> {
        self.counters.get(relation).copied().map(EntityId::new)
    }
}

impl IdSource for CounterIdSource {
    fn next_id(&mut self, root_relation: &str) -> StoreResult<EntityId> {
        let counter = self
            .counters
            .entry(root_relation.to_owned())
            .or_insert(self.start);
        *counter += 1;
        Ok(EntityId::new(*counter))
    }
}

/// Id source drawing every relation's ids from one sequence, so ids are
/// unique across the whole store.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SequenceIdSource {
    last: u64,
}

impl SequenceIdSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last id handed out, if any.
    pub fn last(&self) -> Option<EntityId> {
        (self.last > 0).then_some(EntityId::new(self.last))
    }
}

impl IdSource for SequenceIdSource {
    fn next_id(&mut self, _root_relation: &str) -> StoreResult<EntityId> {
        self.last += 1;
        Ok(EntityId::new(self.last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_per_relation() {
        let mut ids = CounterIdSource::new();
        assert_eq!(ids.next_id("a").unwrap(), EntityId::new(1));
        assert_eq!(ids.next_id("a").unwrap(), EntityId::new(2));
        assert_eq!(ids.next_id("b").unwrap(), EntityId::new(1));
        assert_eq!(ids.last("a"), Some(EntityId::new(2)));
        assert_eq!(ids.last("c"), None);
    }

    #[test]
    fn custom_start() {
        let mut ids = CounterIdSource::starting_at(100);
        assert_eq!(ids.next_id("a").unwrap(), EntityId::new(100));
        assert_eq!(ids.next_id("a").unwrap(), EntityId::new(101));
    }

    #[test]
    fn sequence_is_shared_across_relations() {
        let mut ids = SequenceIdSource::new();
        assert_eq!(ids.last(), None);
        assert_eq!(ids.next_id("a").unwrap(), EntityId::new(1));
        assert_eq!(ids.next_id("b").unwrap(), EntityId::new(2));
        assert_eq!(ids.last(), Some(EntityId::new(2)));
    }
}
