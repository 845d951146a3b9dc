use thiserror::Error;

use crate::id::EntityId;
use crate::value::StoreType;

/// Errors produced by type operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TypeError {
    /// A stored value could not be converted into the target scalar type.
    #[error("cannot convert {found} into {expected}")]
    Conversion { expected: StoreType, found: String },

    /// A stored null was read into a field that has no null representation.
    #[error("null is not allowed for {expected}")]
    NullNotAllowed { expected: StoreType },

    /// An id was assigned to an entity that already has one.
    #[error("entity already has id {current}; refusing to assign {requested}")]
    IdAlreadyAssigned {
        current: EntityId,
        requested: EntityId,
    },

    /// An id too large for a signed 64-bit id column.
    #[error("entity id {0} exceeds the storable range")]
    IdOutOfRange(EntityId),

    /// A textual id could not be parsed.
    #[error("invalid entity id: {0}")]
    InvalidId(String),
}

/// Result alias for type operations.
pub type TypeResult<T> = Result<T, TypeError>;
