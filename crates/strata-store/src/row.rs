//! Rows, selection criteria, and child queries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strata_types::{EntityId, Value};

/// One relation row: field names mapped to stored values.
///
/// The entity id is not a field; backends key rows by id separately.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    fields: BTreeMap<String, Value>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a field, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// The stored value of a field, if present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The stored value of a field; absent fields read as null.
    pub fn get_or_null(&self, name: &str) -> &Value {
        const NULL: &Value = &Value::Null;
        self.fields.get(name).unwrap_or(NULL)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Selects rows of one relation.
#[derive(Clone, Debug, PartialEq)]
pub enum Criteria {
    /// Every row.
    All,
    /// The row with this id.
    Id(EntityId),
    /// Rows whose field equals the value.
    Eq { field: String, value: Value },
    /// Rows matching every nested criterion.
    And(Vec<Criteria>),
}

impl Criteria {
    pub fn id(id: impl Into<EntityId>) -> Self {
        Self::Id(id.into())
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns `true` if the row stored under `id` matches.
    pub fn matches(&self, id: EntityId, row: &Row) -> bool {
        match self {
            Self::All => true,
            Self::Id(wanted) => *wanted == id,
            Self::Eq { field, value } => row.get_or_null(field) == value,
            Self::And(all) => all.iter().all(|c| c.matches(id, row)),
        }
    }
}

/// Selects the child rows linked to one parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChildQuery<'a> {
    /// Field holding the parent's id.
    pub foreign_key: &'a str,
    /// The parent's id.
    pub parent: EntityId,
    /// Field and value distinguishing two collections of the same child
    /// relation on one parent.
    pub collection: Option<(&'a str, u32)>,
}

impl<'a> ChildQuery<'a> {
    pub fn new(foreign_key: &'a str, parent: EntityId) -> Self {
        Self {
            foreign_key,
            parent,
            collection: None,
        }
    }

    pub fn in_collection(mut self, field: &'a str, collection_id: u32) -> Self {
        self.collection = Some((field, collection_id));
        self
    }

    /// Returns `true` if `row` belongs to the parent (and collection).
    pub fn matches(&self, row: &Row) -> bool {
        let linked = row
            .get(self.foreign_key)
            .and_then(EntityId::from_value)
            .is_some_and(|fk| fk == self.parent);
        let in_collection = match self.collection {
            Some((field, cid)) => row.get_or_null(field) == &Value::Int(i64::from(cid)),
            None => true,
        };
        linked && in_collection
    }
}
