use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};
use crate::value::Value;

/// Row identity of a persistent entity.
///
/// Every relation row written for one entity shares the same id. The value
/// `0` is reserved for "not yet assigned"; ids are handed out by an id
/// source the first time an entity is written.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// The "not yet assigned" id.
    pub const UNASSIGNED: Self = Self(0);

    /// Wrap a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw integer.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns `true` once an id source has assigned this id.
    pub const fn is_assigned(self) -> bool {
        self.0 != 0
    }

    /// Stored representation used for id and foreign-key columns.
    ///
    /// Stored integers are signed, so ids above `i64::MAX` cannot be
    /// written and fail with [`TypeError::IdOutOfRange`].
    pub fn to_value(self) -> TypeResult<Value> {
        i64::try_from(self.0)
            .map(Value::Int)
            .map_err(|_| TypeError::IdOutOfRange(self))
    }

    /// Read an id back from a stored id or foreign-key column.
    ///
    /// Returns `None` for nulls, negative integers, and non-numeric text.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => u64::try_from(*i).ok().map(Self),
            Value::Text(s) => s.trim().parse().ok().map(Self),
            _ => None,
        }
    }
}

impl From<u64> for EntityId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl FromStr for EntityId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|e| TypeError::InvalidId(format!("{s:?}: {e}")))
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_assigned() {
            write!(f, "EntityId({})", self.0)
        } else {
            write!(f, "EntityId(unassigned)")
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
